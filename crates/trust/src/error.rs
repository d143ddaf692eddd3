use thiserror::Error;

/// Session liveness failure. Callers treat any of these as an
/// authentication failure for the request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("session has expired")]
    Expired,

    #[error("session has been invalidated")]
    Invalidated,

    #[error("unknown session")]
    NotFound,
}

/// Trust-state failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TrustError {
    /// Terminal: a revoked device can never hold a session again.
    #[error("device trust has been revoked")]
    DeviceRevoked,

    #[error(transparent)]
    Session(#[from] SessionError),
}
