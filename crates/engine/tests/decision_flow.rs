//! End-to-end decision flows through the orchestrator.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use vigil_audit::{AuditSeverity, HmacIntegrityKey};
use vigil_core::{Identity, IdentityId, ManualClock, Role};
use vigil_engine::{Decision, EngineConfig, EvaluateRequest, Orchestrator};
use vigil_policy::{Effect, StepUpFactor};
use vigil_token::{HmacSha256Signer, TokenError, TokenPair};
use vigil_trust::{DeviceAttributes, GeoPoint, Session, TrustOutcome};

const POLICIES: &str = r#"{
    "version": 1,
    "policies": [
        {
            "id": "default-allow-read",
            "resource": "*",
            "action": "read",
            "conditions": [
                {"kind": "threshold", "attribute": "risk_score", "max": 49}
            ],
            "effect": "allow",
            "priority": 1
        },
        {
            "id": "mfa-verified-allow",
            "resource": "*",
            "action": "*",
            "conditions": [
                {"kind": "equals", "attribute": "mfa_verified", "value": true}
            ],
            "effect": "allow",
            "priority": 5
        },
        {
            "id": "high-risk-challenge",
            "resource": "*",
            "action": "*",
            "conditions": [
                {"kind": "threshold", "attribute": "risk_score", "min": 60}
            ],
            "effect": "challenge",
            "step_up": "mfa",
            "priority": 10
        }
    ]
}"#;

fn device() -> DeviceAttributes {
    DeviceAttributes {
        user_agent: "Mozilla/5.0".into(),
        screen_resolution: "2560x1440".into(),
        timezone: "Europe/Berlin".into(),
        language: "de-DE".into(),
        platform: "Linux x86_64".into(),
    }
}

fn berlin() -> GeoPoint {
    GeoPoint::new(52.52, 13.405)
}

fn sydney() -> GeoPoint {
    GeoPoint::new(-33.8688, 151.2093)
}

struct Harness {
    clock: Arc<ManualClock>,
    orchestrator: Orchestrator,
    identity: IdentityId,
}

impl Harness {
    /// Midday start keeps the time-of-day factor neutral.
    fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));

        // Scenarios span simulated hours; stretch the lifetimes so only the
        // behavior under test can end a session.
        let mut config = EngineConfig::default();
        config.token.access_ttl_minutes = 240;
        config.trust.session_ttl_minutes = 480;

        let orchestrator = Orchestrator::new(
            Arc::clone(&clock) as Arc<dyn vigil_core::Clock>,
            Arc::new(HmacSha256Signer::new(b"token-key".to_vec())),
            Arc::new(HmacIntegrityKey::new(b"audit-key".to_vec())),
            config,
        );
        orchestrator.load_policies(POLICIES).unwrap();

        let identity = IdentityId::new();
        orchestrator
            .identities()
            .register(Identity::new(identity, vec![Role::new("user")]));

        Self {
            clock,
            orchestrator,
            identity,
        }
    }

    fn login(&self) -> (Session, TokenPair) {
        self.orchestrator
            .establish_session(self.identity, &device())
            .unwrap()
    }

    fn read_request(&self, token: &str) -> EvaluateRequest {
        let mut request = EvaluateRequest::new(token, device(), "account", "read");
        request.location = Some(berlin());
        request
    }

    /// Accrue device trust with spaced-out benign reads.
    fn warm_device(&self, token: &str, rounds: usize) {
        for _ in 0..rounds {
            let decision = self.orchestrator.evaluate(&self.read_request(token));
            assert!(decision.is_allow(), "warmup read should allow: {decision:?}");
            self.clock.advance(Duration::seconds(61));
        }
    }
}

#[test]
fn neutral_request_on_warmed_device_allows_with_low_risk() {
    let harness = Harness::new();
    let (_, pair) = harness.login();

    harness.warm_device(&pair.access_token, 20);

    let decision = harness.orchestrator.evaluate(&harness.read_request(&pair.access_token));

    assert_eq!(decision.effect, Effect::Allow);
    assert_eq!(decision.reason, "default-allow-read");
    assert!(
        decision.risk_score <= 10,
        "expected low risk, got {}",
        decision.risk_score
    );

    let fingerprint = device().fingerprint();
    let trusted = harness.orchestrator.trust().get_device(&fingerprint).unwrap();
    assert!(trusted.trusted, "twenty benign accesses should promote the device");
}

#[test]
fn battered_device_in_hostile_context_is_challenged_then_allowed_after_mfa() {
    let harness = Harness::new();
    let (session, pair) = harness.login();

    harness.warm_device(&pair.access_token, 20);

    // Three anomalies force the trust score from 70 to 10.
    let fingerprint = device().fingerprint();
    for _ in 0..3 {
        harness
            .orchestrator
            .trust()
            .record_outcome(&fingerprint, TrustOutcome::AnomalyDetected);
    }
    assert_eq!(
        harness.orchestrator.trust().get_device(&fingerprint).unwrap().trust_score,
        10
    );

    // A large transfer from the far side of the planet through an
    // anonymizing network, an hour after the last sighting.
    harness.clock.advance(Duration::hours(1));
    let mut request = EvaluateRequest::new(pair.access_token.clone(), device(), "transfer", "write");
    request.location = Some(sydney());
    request.amount = Some(50_000.0);
    request.anonymizing_network = true;

    let decision = harness.orchestrator.evaluate(&request);

    assert_eq!(decision.effect, Effect::Challenge);
    assert_eq!(decision.reason, "high-risk-challenge");
    assert_eq!(decision.step_up, Some(StepUpFactor::Mfa));
    assert!(
        decision.risk_score > 70,
        "expected risk above 70, got {}",
        decision.risk_score
    );

    // The step-up completes; the same request now falls through the
    // challenge policy to the mfa-verified allow.
    harness.orchestrator.satisfy_step_up(session.id, StepUpFactor::Mfa);
    let decision = harness.orchestrator.evaluate(&request);

    assert_eq!(decision.effect, Effect::Allow);
    assert_eq!(decision.reason, "mfa-verified-allow");
}

#[test]
fn refresh_reuse_burns_the_session_chain() {
    let harness = Harness::new();
    let (session, first) = harness.login();

    // R1 -> R2.
    let second = harness
        .orchestrator
        .rotate_credentials(&first.refresh_token)
        .unwrap();

    // Replaying R1 is a theft signal.
    let replay = harness.orchestrator.rotate_credentials(&first.refresh_token);
    assert!(replay.is_err());

    // Every token descended from the session is revoked, including the
    // freshly rotated pair.
    assert_eq!(
        harness.orchestrator.tokens().verify(&second.access_token),
        Err(TokenError::Revoked)
    );

    // The session itself is dead, so a replayed decision request fails
    // closed too.
    let trust_session = harness.orchestrator.trust().get_session(&session.id).unwrap();
    assert!(trust_session.invalidated);

    let decision = harness
        .orchestrator
        .evaluate(&harness.read_request(&second.access_token));
    assert_eq!(decision.effect, Effect::Deny);
    assert_eq!(decision.reason, "credential_revoked");

    // And the compromise is audited at critical severity.
    let events = harness.orchestrator.audit().verified_events();
    assert!(events.iter().any(|e| {
        e.action == "refresh_reuse_detected" && e.severity == AuditSeverity::Critical
    }));
}

#[test]
fn revoked_unexpired_token_is_denied() {
    let harness = Harness::new();
    let (_, pair) = harness.login();

    harness
        .orchestrator
        .tokens()
        .revoke(pair.access.token_id, pair.access.expires_at);

    let decision = harness.orchestrator.evaluate(&harness.read_request(&pair.access_token));
    assert_eq!(decision.effect, Effect::Deny);
    assert_eq!(decision.reason, "credential_revoked");
}

#[test]
fn session_cap_eviction_invalidates_the_oldest_session() {
    let harness = Harness::new();

    // Default cap is five concurrent sessions per identity.
    let (first_session, first_pair) = harness.login();
    for _ in 0..4 {
        harness.clock.advance(Duration::seconds(1));
        harness.login();
    }

    harness.clock.advance(Duration::seconds(1));
    harness.login(); // sixth login evicts the least-recently-active

    let evicted = harness
        .orchestrator
        .trust()
        .get_session(&first_session.id)
        .unwrap();
    assert!(evicted.invalidated);

    let decision = harness
        .orchestrator
        .evaluate(&harness.read_request(&first_pair.access_token));
    assert_eq!(decision.effect, Effect::Deny);
    assert_eq!(decision.reason, "session_invalidated");

    // Live sessions never exceed the cap.
    assert!(harness.orchestrator.trust().sessions_for(harness.identity).len() <= 5);
}

#[test]
fn revoked_device_is_denied_and_cannot_rejoin() {
    let harness = Harness::new();
    let (_, pair) = harness.login();
    let fingerprint = device().fingerprint();

    harness.orchestrator.revoke_device(&fingerprint).unwrap();

    // The live session is gone and evaluation fails closed.
    let decision = harness.orchestrator.evaluate(&harness.read_request(&pair.access_token));
    assert_eq!(decision.effect, Effect::Deny);
    assert_eq!(decision.reason, "device_revoked");

    // Nor can the device open a fresh session.
    let result = harness.orchestrator.establish_session(harness.identity, &device());
    assert!(result.is_err());

    // No amount of benign traffic resurrects it.
    harness
        .orchestrator
        .trust()
        .record_outcome(&fingerprint, TrustOutcome::BenignAccess);
    let device_state = harness.orchestrator.trust().get_device(&fingerprint).unwrap();
    assert_eq!(device_state.trust_score, 0);
    assert!(device_state.revoked);
}

#[test]
fn deny_decision_is_never_an_implicit_allow() {
    let harness = Harness::new();

    // A deny produced by an error path still carries a reason and shows up
    // in the audit trail.
    let decision: Decision = harness
        .orchestrator
        .evaluate(&harness.read_request("garbage-token"));

    assert_eq!(decision.effect, Effect::Deny);
    assert_eq!(decision.reason, "credential_malformed");
    assert!(
        harness
            .orchestrator
            .audit()
            .verified_events()
            .iter()
            .any(|e| e.action == "evaluation_failed")
    );
}

#[test]
fn audit_subscription_sees_decision_events_as_they_happen() {
    let harness = Harness::new();
    let subscription = harness.orchestrator.audit().subscribe();
    let (_, pair) = harness.login();

    harness.orchestrator.evaluate(&harness.read_request(&pair.access_token));

    let mut actions = Vec::new();
    while let Ok(sealed) = subscription.try_recv() {
        actions.push(sealed.event.action);
    }
    assert!(actions.contains(&"session_established".to_string()));
    assert!(actions.contains(&"authorization_granted".to_string()));
}
