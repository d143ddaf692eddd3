//! Session record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vigil_core::{DeviceFingerprint, IdentityId, SessionId};

use crate::geo::GeoPoint;

/// Where a session was last seen from, and when.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedLocation {
    pub point: GeoPoint,
    pub at: DateTime<Utc>,
}

/// One authenticated session.
///
/// # Invariants
/// - `identity` and `device` never change after creation.
/// - `invalidated` is sticky; a dead session is never resurrected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub identity: IdentityId,
    pub device: DeviceFingerprint,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub invalidated: bool,
    pub last_location: Option<ObservedLocation>,
}

impl Session {
    pub fn new(
        identity: IdentityId,
        device: DeviceFingerprint,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            id: SessionId::new(),
            identity,
            device,
            created_at: now,
            last_activity: now,
            expires_at: now + ttl,
            invalidated: false,
            last_location: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Live means neither invalidated nor expired.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.invalidated && !self.is_expired(now)
    }
}
