//! The trust state store.
//!
//! All device and session mutation funnels through here. Sessions and their
//! per-identity index live behind one lock so cap enforcement is atomic with
//! creation; devices have their own lock.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Duration;

use vigil_core::{Clock, DeviceFingerprint, IdentityId, SessionId};

use crate::anomaly::{self, AnomalySignal};
use crate::config::TrustConfig;
use crate::device::{Device, TrustOutcome};
use crate::error::{SessionError, TrustError};
use crate::geo::GeoPoint;
use crate::session::{ObservedLocation, Session};

#[derive(Debug, Default)]
struct SessionTable {
    by_id: HashMap<SessionId, Session>,
    by_identity: HashMap<IdentityId, Vec<SessionId>>,
}

pub struct TrustStore {
    clock: Arc<dyn Clock>,
    config: TrustConfig,
    devices: RwLock<HashMap<DeviceFingerprint, Device>>,
    sessions: RwLock<SessionTable>,
}

impl TrustStore {
    pub fn new(clock: Arc<dyn Clock>, config: TrustConfig) -> Self {
        Self {
            clock,
            config,
            devices: RwLock::new(HashMap::new()),
            sessions: RwLock::new(SessionTable::default()),
        }
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────
    // Devices
    // ─────────────────────────────────────────────────────────────────────

    /// Fetch a device, registering it with the default score on first sight.
    pub fn get_or_create_device(
        &self,
        fingerprint: &DeviceFingerprint,
        identity: IdentityId,
    ) -> Device {
        let now = self.clock.now();
        let mut devices = self.devices.write().expect("device lock");
        devices
            .entry(fingerprint.clone())
            .or_insert_with(|| {
                tracing::info!(device = %fingerprint, identity = %identity, "device registered");
                Device::new(
                    fingerprint.clone(),
                    identity,
                    self.config.initial_score,
                    now,
                )
            })
            .clone()
    }

    pub fn get_device(&self, fingerprint: &DeviceFingerprint) -> Option<Device> {
        let devices = self.devices.read().expect("device lock");
        devices.get(fingerprint).cloned()
    }

    /// Apply the trust update rule for one observed outcome.
    ///
    /// Benign access also advances `last_seen` and the access counter, so
    /// the +1 step happens at most once per access. Explicit revocation
    /// additionally invalidates every session bound to the device: a revoked
    /// device cannot hold a session.
    pub fn record_outcome(
        &self,
        fingerprint: &DeviceFingerprint,
        outcome: TrustOutcome,
    ) -> Option<Device> {
        let now = self.clock.now();
        let updated = {
            let mut devices = self.devices.write().expect("device lock");
            let device = devices.get_mut(fingerprint)?;

            device.apply_outcome(outcome, &self.config);
            if outcome == TrustOutcome::BenignAccess {
                device.last_seen = now;
                device.access_count += 1;
            }
            device.clone()
        };

        match outcome {
            TrustOutcome::BenignAccess => {}
            TrustOutcome::AnomalyDetected => {
                tracing::warn!(device = %fingerprint, score = updated.trust_score, "anomaly recorded against device");
            }
            TrustOutcome::ExplicitRevocation => {
                tracing::warn!(device = %fingerprint, "device trust revoked");
                self.invalidate_device_sessions(fingerprint);
            }
        }

        Some(updated)
    }

    pub fn list_devices(&self, identity: IdentityId) -> Vec<Device> {
        let devices = self.devices.read().expect("device lock");
        devices
            .values()
            .filter(|d| d.identity == identity)
            .cloned()
            .collect()
    }

    /// Drop a device record entirely (administrative).
    pub fn remove_device(&self, fingerprint: &DeviceFingerprint) -> bool {
        let mut devices = self.devices.write().expect("device lock");
        devices.remove(fingerprint).is_some()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────

    /// Open a session for an identity on a device.
    ///
    /// Enforces the concurrent-session cap atomically with creation: when
    /// the cap is reached, the least-recently-active live session for the
    /// identity is invalidated first, without surfacing an error.
    pub fn open_session(
        &self,
        identity: IdentityId,
        device: &DeviceFingerprint,
    ) -> Result<Session, TrustError> {
        if let Some(d) = self.get_device(device) {
            if d.revoked {
                return Err(TrustError::DeviceRevoked);
            }
        }

        let now = self.clock.now();
        let session = Session::new(
            identity,
            device.clone(),
            now,
            Duration::minutes(self.config.session_ttl_minutes),
        );

        let mut table = self.sessions.write().expect("session lock");

        let live: Vec<SessionId> = table
            .by_identity
            .get(&identity)
            .into_iter()
            .flatten()
            .filter(|id| {
                table
                    .by_id
                    .get(id)
                    .map(|s| s.is_live(now))
                    .unwrap_or(false)
            })
            .copied()
            .collect();

        if live.len() >= self.config.session_cap {
            let evict = live
                .iter()
                .min_by_key(|id| table.by_id.get(id).map(|s| s.last_activity))
                .copied();
            if let Some(evict) = evict {
                if let Some(victim) = table.by_id.get_mut(&evict) {
                    victim.invalidated = true;
                    tracing::info!(session = %evict, identity = %identity, "session evicted by concurrency cap");
                }
            }
        }

        table.by_identity.entry(identity).or_default().push(session.id);
        table.by_id.insert(session.id, session.clone());
        drop(table);

        tracing::info!(session = %session.id, identity = %identity, "session opened");
        Ok(session)
    }

    pub fn get_session(&self, session_id: &SessionId) -> Option<Session> {
        let table = self.sessions.read().expect("session lock");
        table.by_id.get(session_id).cloned()
    }

    /// Record activity on a session, sliding its expiry forward.
    ///
    /// Fails for dead sessions; callers treat that as an authentication
    /// failure for the request.
    pub fn touch(&self, session_id: &SessionId) -> Result<Session, SessionError> {
        let now = self.clock.now();
        let mut table = self.sessions.write().expect("session lock");
        let session = table.by_id.get_mut(session_id).ok_or(SessionError::NotFound)?;

        if session.invalidated {
            return Err(SessionError::Invalidated);
        }
        if session.is_expired(now) {
            return Err(SessionError::Expired);
        }

        session.last_activity = now;
        session.expires_at = now + Duration::minutes(self.config.session_ttl_minutes);
        Ok(session.clone())
    }

    /// Run the anomaly rule for a request and advance the session's last
    /// known location.
    pub fn observe_request(
        &self,
        session_id: &SessionId,
        fingerprint: &DeviceFingerprint,
        location: Option<GeoPoint>,
    ) -> Result<Option<AnomalySignal>, SessionError> {
        let now = self.clock.now();
        let mut table = self.sessions.write().expect("session lock");
        let session = table.by_id.get_mut(session_id).ok_or(SessionError::NotFound)?;

        let signal = anomaly::detect(
            session,
            fingerprint,
            location,
            now,
            self.config.max_travel_speed_kmh,
        );

        if let Some(point) = location {
            session.last_location = Some(ObservedLocation { point, at: now });
        }

        Ok(signal)
    }

    /// Invalidate one session. Idempotent; returns whether the session
    /// existed.
    pub fn invalidate_session(&self, session_id: &SessionId) -> bool {
        let mut table = self.sessions.write().expect("session lock");
        match table.by_id.get_mut(session_id) {
            Some(session) => {
                session.invalidated = true;
                true
            }
            None => false,
        }
    }

    /// Invalidate every session belonging to an identity. Returns the count
    /// of sessions newly invalidated.
    pub fn invalidate_all_for_identity(&self, identity: IdentityId) -> usize {
        let mut table = self.sessions.write().expect("session lock");
        let ids = table
            .by_identity
            .get(&identity)
            .cloned()
            .unwrap_or_default();

        let mut count = 0;
        for id in ids {
            if let Some(session) = table.by_id.get_mut(&id) {
                if !session.invalidated {
                    session.invalidated = true;
                    count += 1;
                }
            }
        }

        if count > 0 {
            tracing::info!(identity = %identity, count, "all sessions invalidated");
        }
        count
    }

    /// Live sessions for an identity, most recently active first.
    pub fn sessions_for(&self, identity: IdentityId) -> Vec<Session> {
        let now = self.clock.now();
        let table = self.sessions.read().expect("session lock");
        let mut sessions: Vec<Session> = table
            .by_identity
            .get(&identity)
            .into_iter()
            .flatten()
            .filter_map(|id| table.by_id.get(id))
            .filter(|s| s.is_live(now))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        sessions
    }

    fn invalidate_device_sessions(&self, fingerprint: &DeviceFingerprint) {
        let mut table = self.sessions.write().expect("session lock");
        for session in table.by_id.values_mut() {
            if session.device == *fingerprint {
                session.invalidated = true;
            }
        }
    }
}
