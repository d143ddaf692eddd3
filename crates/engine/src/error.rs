//! Unified evaluation error.
//!
//! Every variant is caught at the orchestrator boundary and converted into
//! a Deny decision; nothing here ever escapes as an implicit Allow.

use thiserror::Error;

use vigil_audit::AuditSeverity;
use vigil_core::DependencyError;
use vigil_policy::PolicyLoadError;
use vigil_token::TokenError;
use vigil_trust::{SessionError, TrustError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluateError {
    #[error(transparent)]
    Credential(#[from] TokenError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Trust(#[from] TrustError),

    #[error(transparent)]
    PolicyLoad(#[from] PolicyLoadError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

impl EvaluateError {
    /// Stable reason code carried by the Deny decision and its audit event.
    pub fn reason_code(&self) -> &'static str {
        match self {
            EvaluateError::Credential(TokenError::Expired) => "credential_expired",
            EvaluateError::Credential(TokenError::Malformed(_)) => "credential_malformed",
            EvaluateError::Credential(TokenError::Revoked) => "credential_revoked",
            EvaluateError::Credential(TokenError::AlreadyRotated) => "session_compromised",
            EvaluateError::Credential(TokenError::IdentityInactive) => "identity_inactive",

            EvaluateError::Session(e) | EvaluateError::Trust(TrustError::Session(e)) => match e {
                SessionError::Expired => "session_expired",
                SessionError::Invalidated => "session_invalidated",
                SessionError::NotFound => "session_unknown",
            },

            EvaluateError::Trust(TrustError::DeviceRevoked) => "device_revoked",

            EvaluateError::PolicyLoad(_) => "policy_unavailable",

            EvaluateError::Dependency(DependencyError::Timeout(_)) => "dependency_timeout",
            EvaluateError::Dependency(DependencyError::Unavailable(_)) => "dependency_unavailable",
        }
    }

    /// How loudly the failure is audited.
    ///
    /// Expected authentication failures are warnings; infrastructure
    /// failures are errors; compromise signals are critical.
    pub fn severity(&self) -> AuditSeverity {
        match self {
            EvaluateError::Credential(TokenError::AlreadyRotated) => AuditSeverity::Critical,
            EvaluateError::Credential(_) | EvaluateError::Session(_) | EvaluateError::Trust(_) => {
                AuditSeverity::Warning
            }
            EvaluateError::PolicyLoad(_) | EvaluateError::Dependency(_) => AuditSeverity::Error,
        }
    }
}
