//! Token lifecycle manager.
//!
//! Owns the revocation set and the per-session rotation chains. Rotation is
//! atomic: the check "is this the active refresh token" and the act of
//! superseding it happen under one lock, which is exactly the race the
//! reuse-detection exists to catch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use vigil_core::{Clock, DeviceFingerprint, Identity, IdentityId, Role, SessionId, TokenId};

use crate::claims::{TokenClaims, TokenKind};
use crate::codec::{decode_token, encode_token};
use crate::error::TokenError;
use crate::revocation::RevocationSet;
use crate::signer::TokenSigner;

/// Lifetimes for the credential pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: i64,

    /// Refresh token TTL in minutes.
    #[serde(default = "default_refresh_ttl_minutes")]
    pub refresh_ttl_minutes: i64,
}

fn default_access_ttl_minutes() -> i64 {
    15
}

fn default_refresh_ttl_minutes() -> i64 {
    // 7 days
    7 * 24 * 60
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_ttl_minutes: default_access_ttl_minutes(),
            refresh_ttl_minutes: default_refresh_ttl_minutes(),
        }
    }
}

impl TokenConfig {
    fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_ttl_minutes)
    }

    fn refresh_ttl(&self) -> Duration {
        Duration::minutes(self.refresh_ttl_minutes)
    }
}

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access: TokenClaims,
    pub refresh: TokenClaims,
}

/// Every token ever minted for one session, plus which refresh token is
/// currently redeemable.
#[derive(Debug)]
struct SessionChain {
    active_refresh: TokenId,
    issued: Vec<(TokenId, DateTime<Utc>)>,
}

pub struct TokenManager {
    clock: Arc<dyn Clock>,
    signer: Arc<dyn TokenSigner>,
    config: TokenConfig,
    revocations: RevocationSet,
    chains: Mutex<HashMap<SessionId, SessionChain>>,
}

impl TokenManager {
    pub fn new(clock: Arc<dyn Clock>, signer: Arc<dyn TokenSigner>, config: TokenConfig) -> Self {
        Self {
            clock,
            signer,
            config,
            revocations: RevocationSet::new(),
            chains: Mutex::new(HashMap::new()),
        }
    }

    pub fn revocations(&self) -> &RevocationSet {
        &self.revocations
    }

    /// Mint the credential pair for a session.
    ///
    /// Fails with `IdentityInactive` for deactivated or locked identities.
    pub fn issue(
        &self,
        identity: &Identity,
        session: SessionId,
        device: DeviceFingerprint,
    ) -> Result<TokenPair, TokenError> {
        if !identity.is_usable() {
            return Err(TokenError::IdentityInactive);
        }

        let now = self.clock.now();
        let pair = self.mint_pair(identity.id, &identity.roles, session, device, now);

        let mut chains = self.chains.lock().expect("chain lock");
        let chain = chains.entry(session).or_insert_with(|| SessionChain {
            active_refresh: pair.refresh.token_id,
            issued: Vec::new(),
        });
        chain.active_refresh = pair.refresh.token_id;
        chain
            .issued
            .push((pair.access.token_id, pair.access.expires_at));
        chain
            .issued
            .push((pair.refresh.token_id, pair.refresh.expires_at));
        drop(chains);

        tracing::info!(identity = %identity.id, session = %session, "token pair issued");
        Ok(pair)
    }

    /// Decode and validate an access token.
    ///
    /// The revocation set is consulted before the expiry window so that a
    /// not-yet-expired but revoked token is rejected even under clock skew.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims: TokenClaims = decode_token(token, &*self.signer)?;
        claims.expect_kind(TokenKind::Access)?;

        let now = self.clock.now();
        if self.revocations.contains(&claims.token_id, now) {
            return Err(TokenError::Revoked);
        }
        claims.validate(now)?;

        Ok(claims)
    }

    /// Redeem a refresh token for a new pair.
    ///
    /// Single-use: redemption supersedes the prior refresh token. Redeeming a
    /// superseded one fails `AlreadyRotated` and revokes every token descended
    /// from the session.
    pub fn rotate(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let claims: TokenClaims = decode_token(refresh_token, &*self.signer)?;
        claims.expect_kind(TokenKind::Refresh)?;

        let now = self.clock.now();
        claims.validate(now)?;

        let mut chains = self.chains.lock().expect("chain lock");
        let Some(active_refresh) = chains.get(&claims.session).map(|c| c.active_refresh) else {
            // The chain is gone: the session was revoked out from under this
            // token.
            return Err(TokenError::Revoked);
        };

        // Reuse detection comes before the plain revocation check: a
        // superseded refresh token is in the revocation set too, and
        // reporting it as merely revoked would hide the theft signal.
        if active_refresh != claims.token_id {
            if let Some(chain) = chains.remove(&claims.session) {
                for (token_id, expires_at) in chain.issued {
                    self.revocations.revoke(token_id, expires_at);
                }
            }
            drop(chains);
            tracing::warn!(
                session = %claims.session,
                "refresh token reuse detected; session chain revoked"
            );
            return Err(TokenError::AlreadyRotated);
        }

        if self.revocations.contains(&claims.token_id, now) {
            return Err(TokenError::Revoked);
        }

        // Happy path: supersede the redeemed token and mint the next pair.
        self.revocations.revoke(claims.token_id, claims.expires_at);

        let pair = self.mint_pair(
            claims.identity,
            &claims.roles,
            claims.session,
            claims.device.clone(),
            now,
        );

        let chain = chains.get_mut(&claims.session).expect("chain present");
        chain.active_refresh = pair.refresh.token_id;
        chain
            .issued
            .push((pair.access.token_id, pair.access.expires_at));
        chain
            .issued
            .push((pair.refresh.token_id, pair.refresh.expires_at));
        drop(chains);

        tracing::info!(session = %claims.session, "refresh token rotated");
        Ok(pair)
    }

    /// Decode a token without liveness checks.
    ///
    /// Signature verification still applies; expiry and revocation do not.
    /// For introspection of compromised credentials, not for authentication.
    pub fn peek(&self, token: &str) -> Result<TokenClaims, TokenError> {
        decode_token(token, &*self.signer)
    }

    /// Revoke a single token. Idempotent.
    pub fn revoke(&self, token_id: TokenId, expires_at: DateTime<Utc>) {
        self.revocations.revoke(token_id, expires_at);
    }

    /// Revoke every token descended from a session. Idempotent.
    pub fn revoke_session(&self, session: SessionId) {
        let mut chains = self.chains.lock().expect("chain lock");
        let Some(chain) = chains.remove(&session) else {
            return;
        };
        for (token_id, expires_at) in chain.issued {
            self.revocations.revoke(token_id, expires_at);
        }
        drop(chains);
        tracing::info!(session = %session, "session tokens revoked");
    }

    fn mint_pair(
        &self,
        identity: IdentityId,
        roles: &[Role],
        session: SessionId,
        device: DeviceFingerprint,
        now: DateTime<Utc>,
    ) -> TokenPair {
        let access = TokenClaims {
            kind: TokenKind::Access,
            token_id: TokenId::new(),
            identity,
            session,
            device: device.clone(),
            roles: roles.to_vec(),
            issued_at: now,
            expires_at: now + self.config.access_ttl(),
        };
        let refresh = TokenClaims {
            kind: TokenKind::Refresh,
            token_id: TokenId::new(),
            identity,
            session,
            device,
            roles: roles.to_vec(),
            issued_at: now,
            expires_at: now + self.config.refresh_ttl(),
        };

        // Serialization of plain claims structs cannot fail.
        let access_token = encode_token(&access, &*self.signer).expect("encode access token");
        let refresh_token = encode_token(&refresh, &*self.signer).expect("encode refresh token");

        TokenPair {
            access_token,
            refresh_token,
            access,
            refresh,
        }
    }
}
