//! Shared revocation set.
//!
//! Logically a set of `(token_id, expiry)` pairs. Entries whose expiry has
//! passed are dropped lazily: `contains` evicts the single entry it touches,
//! and `prune` does a full sweep for callers that want one opportunistically.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use vigil_core::TokenId;

#[derive(Debug, Default)]
pub struct RevocationSet {
    entries: RwLock<HashMap<TokenId, DateTime<Utc>>>,
}

impl RevocationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token to the set. Idempotent; re-revoking keeps the later expiry
    /// so an entry never shrinks its window.
    pub fn revoke(&self, token_id: TokenId, expires_at: DateTime<Utc>) {
        let mut entries = self.entries.write().expect("revocation lock");
        entries
            .entry(token_id)
            .and_modify(|existing| {
                if *existing < expires_at {
                    *existing = expires_at;
                }
            })
            .or_insert(expires_at);
    }

    /// Whether the token is currently revoked.
    ///
    /// An entry past its expiry is removed on the spot (the token fails its
    /// own expiry check from here on, so the entry no longer earns its keep).
    pub fn contains(&self, token_id: &TokenId, now: DateTime<Utc>) -> bool {
        let entries = self.entries.read().expect("revocation lock");
        match entries.get(token_id) {
            None => false,
            Some(expires_at) if *expires_at > now => true,
            Some(_) => {
                drop(entries);
                let mut entries = self.entries.write().expect("revocation lock");
                // Re-check under the write lock; a concurrent revoke may have
                // extended the entry.
                match entries.get(token_id) {
                    Some(expires_at) if *expires_at > now => true,
                    Some(_) => {
                        entries.remove(token_id);
                        false
                    }
                    None => false,
                }
            }
        }
    }

    /// Full sweep of expired entries. Returns how many were dropped.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().expect("revocation lock");
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("revocation lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn revoked_token_is_contained_until_expiry() {
        let set = RevocationSet::new();
        let id = TokenId::new();
        let now = Utc::now();

        set.revoke(id, now + Duration::minutes(15));
        assert!(set.contains(&id, now));
        assert!(!set.contains(&id, now + Duration::minutes(16)));
    }

    #[test]
    fn expired_entry_is_evicted_on_lookup() {
        let set = RevocationSet::new();
        let id = TokenId::new();
        let now = Utc::now();

        set.revoke(id, now + Duration::minutes(1));
        assert_eq!(set.len(), 1);

        assert!(!set.contains(&id, now + Duration::minutes(2)));
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn revoke_is_idempotent_and_keeps_longer_window() {
        let set = RevocationSet::new();
        let id = TokenId::new();
        let now = Utc::now();

        set.revoke(id, now + Duration::minutes(5));
        set.revoke(id, now + Duration::minutes(30));
        set.revoke(id, now + Duration::minutes(1));
        assert_eq!(set.len(), 1);

        // The widest window survives.
        assert!(set.contains(&id, now + Duration::minutes(20)));
    }

    #[test]
    fn prune_sweeps_only_expired_entries() {
        let set = RevocationSet::new();
        let now = Utc::now();
        let stale = TokenId::new();
        let live = TokenId::new();

        set.revoke(stale, now - Duration::minutes(1));
        set.revoke(live, now + Duration::minutes(10));

        assert_eq!(set.prune(now), 1);
        assert_eq!(set.len(), 1);
        assert!(set.contains(&live, now));
    }
}
