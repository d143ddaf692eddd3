//! Token claims model (transport-agnostic).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vigil_core::{DeviceFingerprint, IdentityId, Role, SessionId, TokenId};

use crate::error::TokenError;

/// Which half of the credential pair a token is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl core::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Claims carried by both access and refresh tokens.
///
/// `token_id` is the revocation-set key and must stay unique for the life of
/// its revocation window. Refresh tokens carry roles and the device binding
/// so rotation can mint a fresh access token without a directory lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub kind: TokenKind,
    pub token_id: TokenId,
    pub identity: IdentityId,
    pub session: SessionId,
    pub device: DeviceFingerprint,
    pub roles: Vec<Role>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TokenClaims {
    /// Deterministic claims-window validation against an injected `now`.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), TokenError> {
        validate_window(self.issued_at, self.expires_at, now)
    }

    pub fn expect_kind(&self, kind: TokenKind) -> Result<(), TokenError> {
        if self.kind != kind {
            return Err(TokenError::malformed(format!(
                "expected {kind} token, got {}",
                self.kind
            )));
        }
        Ok(())
    }
}

/// Validate an issuance/expiry window.
///
/// An inverted window or a future issuance is malformed rather than expired;
/// it cannot have been produced by a well-behaved issuer.
pub fn validate_window(
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), TokenError> {
    if expires_at <= issued_at {
        return Err(TokenError::malformed("expires_at precedes issued_at"));
    }
    if now < issued_at {
        return Err(TokenError::malformed("issued_at is in the future"));
    }
    if now >= expires_at {
        return Err(TokenError::Expired);
    }
    Ok(())
}
