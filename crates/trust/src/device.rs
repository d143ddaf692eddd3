//! Device identity and the trust-score update rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use vigil_core::{DeviceFingerprint, IdentityId};

use crate::config::TrustConfig;

/// Client-supplied attributes a fingerprint is derived from.
///
/// Field order is fixed; the fingerprint is the SHA-256 of the canonical
/// JSON serialization, so reordering fields would re-key every device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAttributes {
    pub user_agent: String,
    pub screen_resolution: String,
    pub timezone: String,
    pub language: String,
    pub platform: String,
}

impl DeviceAttributes {
    pub fn fingerprint(&self) -> DeviceFingerprint {
        // Struct serialization is deterministic for a fixed field order.
        let canonical = serde_json::to_vec(self).expect("serialize device attributes");
        let digest = Sha256::digest(&canonical);
        DeviceFingerprint::new(hex::encode(digest))
    }
}

/// Outcome reported against a device after a finalized decision.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustOutcome {
    BenignAccess,
    AnomalyDetected,
    ExplicitRevocation,
}

/// A sighted device and its reputation.
///
/// # Invariants
/// - `trust_score` stays in `[0, 100]` and is only written by
///   `apply_outcome`.
/// - `revoked` is terminal: no later outcome can clear it or move the score
///   off zero. A fresh fingerprint must be registered instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub fingerprint: DeviceFingerprint,
    pub identity: IdentityId,
    pub trust_score: u8,
    pub trusted: bool,
    pub revoked: bool,
    pub registered_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub access_count: u64,
}

impl Device {
    pub fn new(
        fingerprint: DeviceFingerprint,
        identity: IdentityId,
        initial_score: u8,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            fingerprint,
            identity,
            trust_score: initial_score.min(100),
            trusted: false,
            revoked: false,
            registered_at: now,
            last_seen: now,
            access_count: 0,
        }
    }

    /// Apply the trust update rule.
    ///
    /// Benign access: +`benign_step`, capped at 100, trusted flag earned at
    /// the promotion threshold. Anomaly: -`anomaly_step`, floored at 0,
    /// trusted flag lost below the floor. Revocation: score forced to 0,
    /// terminal.
    pub fn apply_outcome(&mut self, outcome: TrustOutcome, config: &TrustConfig) {
        if self.revoked {
            return;
        }

        match outcome {
            TrustOutcome::BenignAccess => {
                self.trust_score = self.trust_score.saturating_add(config.benign_step).min(100);
                if self.trust_score >= config.promote_threshold {
                    self.trusted = true;
                }
            }
            TrustOutcome::AnomalyDetected => {
                self.trust_score = self.trust_score.saturating_sub(config.anomaly_step);
                if self.trust_score < config.trusted_floor {
                    self.trusted = false;
                }
            }
            TrustOutcome::ExplicitRevocation => {
                self.trust_score = 0;
                self.trusted = false;
                self.revoked = true;
            }
        }
    }
}
