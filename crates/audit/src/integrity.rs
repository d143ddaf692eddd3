//! Integrity tagging.
//!
//! Tags are computed at append time by a capability supplied by the
//! key-management collaborator; the HMAC implementation here is the default.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::event::AuditEvent;

type HmacSha256 = Hmac<Sha256>;

/// Keyed tagging capability for audit records.
pub trait IntegrityKey: Send + Sync {
    fn seal(&self, payload: &[u8]) -> Vec<u8>;

    fn verify(&self, payload: &[u8], tag: &[u8]) -> bool;
}

impl<K> IntegrityKey for std::sync::Arc<K>
where
    K: IntegrityKey + ?Sized,
{
    fn seal(&self, payload: &[u8]) -> Vec<u8> {
        (**self).seal(payload)
    }

    fn verify(&self, payload: &[u8], tag: &[u8]) -> bool {
        (**self).verify(payload, tag)
    }
}

/// HMAC-SHA-256 over the canonical event serialization.
#[derive(Clone)]
pub struct HmacIntegrityKey {
    key: Vec<u8>,
}

impl HmacIntegrityKey {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length.
        HmacSha256::new_from_slice(&self.key).expect("hmac key")
    }
}

impl core::fmt::Debug for HmacIntegrityKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HmacIntegrityKey").finish_non_exhaustive()
    }
}

impl IntegrityKey for HmacIntegrityKey {
    fn seal(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    fn verify(&self, payload: &[u8], tag: &[u8]) -> bool {
        let mut mac = self.mac();
        mac.update(payload);
        mac.verify_slice(tag).is_ok()
    }
}

/// An audit event plus its integrity tag (hex).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedEvent {
    pub event: AuditEvent,
    pub tag: String,
}

impl SealedEvent {
    /// Seal an event. The tag covers the canonical JSON serialization.
    pub fn seal<K: IntegrityKey + ?Sized>(event: AuditEvent, key: &K) -> Self {
        let payload = serde_json::to_vec(&event).expect("serialize audit event");
        let tag = hex::encode(key.seal(&payload));
        Self { event, tag }
    }

    /// Check the tag against the event as currently serialized.
    pub fn verify<K: IntegrityKey + ?Sized>(&self, key: &K) -> bool {
        let payload = match serde_json::to_vec(&self.event) {
            Ok(payload) => payload,
            Err(_) => return false,
        };
        match hex::decode(&self.tag) {
            Ok(tag) => key.verify(&payload, &tag),
            Err(_) => false,
        }
    }
}
