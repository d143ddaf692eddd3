//! Identity record and directory.
//!
//! Identities are never deleted, only deactivated. Mutation happens through
//! the directory so concurrent authentication attempts against the same
//! identity serialize on one lock.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::id::IdentityId;

/// Role granted to an identity.
///
/// Roles are opaque strings at this layer; the policy engine decides what
/// they mean via membership conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authenticated actor.
///
/// # Invariants
/// - `id` and role ordering are stable after creation.
/// - Deactivation is administrative and sticky; the request path never
///   reactivates an identity.
/// - `failed_attempts` only resets through `record_success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub roles: Vec<Role>,
    pub active: bool,
    pub locked: bool,
    pub failed_attempts: u32,
}

impl Identity {
    pub fn new(id: IdentityId, roles: Vec<Role>) -> Self {
        Self {
            id,
            roles,
            active: true,
            locked: false,
            failed_attempts: 0,
        }
    }

    /// An identity may hold credentials only while active and unlocked.
    pub fn is_usable(&self) -> bool {
        self.active && !self.locked
    }
}

/// In-memory identity directory.
///
/// Stands in for the durable identity store collaborator; same contract,
/// per-key serialized updates.
#[derive(Debug, Default)]
pub struct IdentityDirectory {
    identities: RwLock<HashMap<IdentityId, Identity>>,
}

impl IdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, identity: Identity) {
        let mut identities = self.identities.write().expect("identity lock");
        identities.insert(identity.id, identity);
    }

    pub fn get(&self, id: &IdentityId) -> Option<Identity> {
        let identities = self.identities.read().expect("identity lock");
        identities.get(id).cloned()
    }

    /// Record a failed authentication attempt.
    ///
    /// Locks the identity once the counter reaches `lockout_threshold`.
    /// Returns the updated record, or `None` for an unknown identity.
    pub fn record_failure(&self, id: &IdentityId, lockout_threshold: u32) -> Option<Identity> {
        let mut identities = self.identities.write().expect("identity lock");
        let identity = identities.get_mut(id)?;

        identity.failed_attempts = identity.failed_attempts.saturating_add(1);
        if identity.failed_attempts >= lockout_threshold && !identity.locked {
            identity.locked = true;
            tracing::warn!(identity = %id, attempts = identity.failed_attempts, "identity locked");
        }

        Some(identity.clone())
    }

    /// Clear the failed-attempt counter after a successful authentication.
    pub fn record_success(&self, id: &IdentityId) -> Option<Identity> {
        let mut identities = self.identities.write().expect("identity lock");
        let identity = identities.get_mut(id)?;
        identity.failed_attempts = 0;
        Some(identity.clone())
    }

    /// Administrative deactivation. Terminal for the request path.
    pub fn deactivate(&self, id: &IdentityId) -> Option<Identity> {
        let mut identities = self.identities.write().expect("identity lock");
        let identity = identities.get_mut(id)?;
        identity.active = false;
        tracing::info!(identity = %id, "identity deactivated");
        Some(identity.clone())
    }

    /// Administrative unlock (e.g. after a support flow).
    pub fn unlock(&self, id: &IdentityId) -> Option<Identity> {
        let mut identities = self.identities.write().expect("identity lock");
        let identity = identities.get_mut(id)?;
        identity.locked = false;
        identity.failed_attempts = 0;
        Some(identity.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory_with(id: IdentityId) -> IdentityDirectory {
        let directory = IdentityDirectory::new();
        directory.register(Identity::new(id, vec![Role::new("user")]));
        directory
    }

    #[test]
    fn repeated_failures_lock_the_identity() {
        let id = IdentityId::new();
        let directory = directory_with(id);

        for _ in 0..4 {
            let identity = directory.record_failure(&id, 5).unwrap();
            assert!(!identity.locked);
        }

        let identity = directory.record_failure(&id, 5).unwrap();
        assert!(identity.locked);
        assert!(!identity.is_usable());
    }

    #[test]
    fn success_resets_the_counter() {
        let id = IdentityId::new();
        let directory = directory_with(id);

        directory.record_failure(&id, 5);
        directory.record_failure(&id, 5);
        let identity = directory.record_success(&id).unwrap();

        assert_eq!(identity.failed_attempts, 0);
        assert!(identity.is_usable());
    }

    #[test]
    fn deactivation_is_terminal_for_usability() {
        let id = IdentityId::new();
        let directory = directory_with(id);

        let identity = directory.deactivate(&id).unwrap();
        assert!(!identity.active);
        assert!(!identity.is_usable());
    }

    #[test]
    fn unlock_clears_lock_and_counter() {
        let id = IdentityId::new();
        let directory = directory_with(id);

        for _ in 0..5 {
            directory.record_failure(&id, 5);
        }
        assert!(directory.get(&id).unwrap().locked);

        let identity = directory.unlock(&id).unwrap();
        assert!(!identity.locked);
        assert_eq!(identity.failed_attempts, 0);
    }
}
