//! Shared error vocabulary for external-capability failures.

use thiserror::Error;

/// Result type for calls into external collaborators (store, key service).
pub type DependencyResult<T> = Result<T, DependencyError>;

/// Failure of an external capability the core depends on.
///
/// Callers treat both variants as recoverable: the orchestrator converts
/// them into a Deny decision, never a crash.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DependencyError {
    /// The collaborator did not answer within its deadline.
    #[error("dependency timed out: {0}")]
    Timeout(String),

    /// The collaborator is unreachable or refused the call.
    #[error("dependency unavailable: {0}")]
    Unavailable(String),
}

impl DependencyError {
    pub fn timeout(what: impl Into<String>) -> Self {
        Self::Timeout(what.into())
    }

    pub fn unavailable(what: impl Into<String>) -> Self {
        Self::Unavailable(what.into())
    }
}
