use thiserror::Error;

/// Credential failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token has been revoked")]
    Revoked,

    /// The refresh token was already redeemed; redeeming it again is treated
    /// as a theft signal and revokes the whole session chain.
    #[error("refresh token already rotated")]
    AlreadyRotated,

    #[error("identity is inactive")]
    IdentityInactive,
}

impl TokenError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}
