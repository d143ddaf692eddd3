//! Audit event model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vigil_core::{IdentityId, SessionId};

/// What part of the system an event belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Authentication,
    Authorization,
    Session,
    Token,
    Security,
    Admin,
}

impl core::fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AuditCategory::Authentication => f.write_str("authentication"),
            AuditCategory::Authorization => f.write_str("authorization"),
            AuditCategory::Session => f.write_str("session"),
            AuditCategory::Token => f.write_str("token"),
            AuditCategory::Security => f.write_str("security"),
            AuditCategory::Admin => f.write_str("admin"),
        }
    }
}

/// How loudly an event should be surfaced.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// How the audited action ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Denied,
    Challenged,
    Failure,
}

/// One immutable audit record.
///
/// Never mutated or deleted once appended; retention is an external
/// concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub category: AuditCategory,
    pub severity: AuditSeverity,
    pub identity: Option<IdentityId>,
    pub session: Option<SessionId>,
    pub action: String,
    pub resource: Option<String>,
    pub outcome: AuditOutcome,
    pub detail: serde_json::Value,
}

impl AuditEvent {
    pub fn new(
        category: AuditCategory,
        severity: AuditSeverity,
        action: impl Into<String>,
        outcome: AuditOutcome,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            timestamp,
            category,
            severity,
            identity: None,
            session: None,
            action: action.into(),
            resource: None,
            outcome,
            detail: serde_json::Value::Null,
        }
    }

    pub fn with_identity(mut self, identity: IdentityId) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}
