//! The decision orchestrator.
//!
//! Sequencing per request: verify token → identity gate → trust lookup →
//! session touch → anomaly observation → risk scoring → policy evaluation →
//! audit (decision first, outcome update second) → trust outcome recording.
//! Policy evaluation itself is pure; every state mutation happens in the
//! trust store after the decision is finalized.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Duration;

use vigil_audit::{
    AuditCategory, AuditEvent, AuditOutcome, AuditPipeline, AuditSeverity, IntegrityKey,
};
use vigil_core::{Clock, DeviceFingerprint, Identity, IdentityDirectory, IdentityId, SessionId};
use vigil_policy::{Effect, PolicyEngine, PolicyLoadError, RISK_SCORE_ATTR, StepUpFactor};
use vigil_risk::{RiskContext, RiskEngine};
use vigil_token::{TokenError, TokenManager, TokenPair, TokenSigner};
use vigil_trust::{Device, Session, TrustError, TrustOutcome, TrustStore};

use crate::config::EngineConfig;
use crate::decision::Decision;
use crate::error::EvaluateError;
use crate::request::EvaluateRequest;

pub struct Orchestrator {
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    identities: Arc<IdentityDirectory>,
    tokens: Arc<TokenManager>,
    trust: Arc<TrustStore>,
    risk: RiskEngine,
    policy: Arc<PolicyEngine>,
    audit: Arc<AuditPipeline>,
    step_ups: Mutex<HashMap<SessionId, HashSet<StepUpFactor>>>,
}

impl Orchestrator {
    /// Wire up the core from its capabilities and configuration.
    ///
    /// The policy engine starts without a snapshot and refuses to serve
    /// decisions until `load_policies` succeeds.
    pub fn new(
        clock: Arc<dyn Clock>,
        signer: Arc<dyn TokenSigner>,
        integrity_key: Arc<dyn IntegrityKey>,
        config: EngineConfig,
    ) -> Self {
        let tokens = Arc::new(TokenManager::new(
            Arc::clone(&clock),
            signer,
            config.token.clone(),
        ));
        let trust = Arc::new(TrustStore::new(Arc::clone(&clock), config.trust.clone()));
        let risk = RiskEngine::new(config.risk.clone());

        Self {
            clock,
            config,
            identities: Arc::new(IdentityDirectory::new()),
            tokens,
            trust,
            risk,
            policy: Arc::new(PolicyEngine::new()),
            audit: Arc::new(AuditPipeline::new(integrity_key)),
            step_ups: Mutex::new(HashMap::new()),
        }
    }

    pub fn identities(&self) -> &IdentityDirectory {
        &self.identities
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn trust(&self) -> &TrustStore {
        &self.trust
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn audit(&self) -> &AuditPipeline {
        &self.audit
    }

    /// Install a policy snapshot, all-or-nothing.
    pub fn load_policies(&self, json: &str) -> Result<(), PolicyLoadError> {
        let now = self.clock.now();
        match self.policy.load_json(json) {
            Ok(()) => {
                self.audit.append(
                    AuditEvent::new(
                        AuditCategory::Admin,
                        AuditSeverity::Info,
                        "policy_snapshot_loaded",
                        AuditOutcome::Success,
                        now,
                    )
                    .with_detail(serde_json::json!({
                        "version": self.policy.current_version(),
                    })),
                );
                Ok(())
            }
            Err(e) => {
                self.audit.append(
                    AuditEvent::new(
                        AuditCategory::Admin,
                        AuditSeverity::Error,
                        "policy_snapshot_rejected",
                        AuditOutcome::Failure,
                        now,
                    )
                    .with_detail(serde_json::json!({"error": e.to_string()})),
                );
                Err(e)
            }
        }
    }

    /// Open a session and mint its credential pair for an already
    /// authenticated identity.
    pub fn establish_session(
        &self,
        identity_id: IdentityId,
        device_attributes: &vigil_trust::DeviceAttributes,
    ) -> Result<(Session, TokenPair), EvaluateError> {
        let identity = self
            .identities
            .get(&identity_id)
            .ok_or(TokenError::IdentityInactive)?;
        if !identity.is_usable() {
            return Err(TokenError::IdentityInactive.into());
        }

        let fingerprint = device_attributes.fingerprint();
        self.trust.get_or_create_device(&fingerprint, identity.id);
        let session = self.trust.open_session(identity.id, &fingerprint)?;
        let pair = self.tokens.issue(&identity, session.id, fingerprint)?;

        self.audit.append(
            AuditEvent::new(
                AuditCategory::Authentication,
                AuditSeverity::Info,
                "session_established",
                AuditOutcome::Success,
                self.clock.now(),
            )
            .with_identity(identity.id)
            .with_session(session.id),
        );

        Ok((session, pair))
    }

    /// The enforcement point's single synchronous operation.
    ///
    /// Fail closed: any error becomes a Deny decision carrying the error
    /// kind as its reason, plus an audit event. Never an implicit Allow.
    pub fn evaluate(&self, request: &EvaluateRequest) -> Decision {
        match self.evaluate_inner(request) {
            Ok(decision) => decision,
            Err(error) => {
                let reason = error.reason_code();
                self.audit.append(
                    AuditEvent::new(
                        AuditCategory::Authorization,
                        error.severity(),
                        "evaluation_failed",
                        AuditOutcome::Failure,
                        self.clock.now(),
                    )
                    .with_resource(request.resource.as_str())
                    .with_detail(serde_json::json!({
                        "reason": reason,
                        "error": error.to_string(),
                    })),
                );
                tracing::warn!(reason, "evaluation failed closed");
                Decision::deny(reason)
            }
        }
    }

    fn evaluate_inner(&self, request: &EvaluateRequest) -> Result<Decision, EvaluateError> {
        let now = self.clock.now();

        // Credential.
        let claims = self.tokens.verify(&request.access_token)?;

        // Identity gate. An identity the directory no longer knows is
        // treated the same as a deactivated one.
        let identity = self
            .identities
            .get(&claims.identity)
            .ok_or(TokenError::IdentityInactive)?;
        if !identity.is_usable() {
            return Err(TokenError::IdentityInactive.into());
        }

        // Trust lookup.
        let fingerprint = request.device_attributes.fingerprint();
        let device = self.trust.get_or_create_device(&fingerprint, identity.id);
        if device.revoked {
            return Err(TrustError::DeviceRevoked.into());
        }

        // Session liveness; the returned snapshot still carries the
        // pre-request location for scoring.
        let session = self.trust.touch(&claims.session)?;
        if session.identity != claims.identity {
            return Err(TokenError::malformed("session not bound to token identity").into());
        }

        // Anomaly observation advances the session's location state.
        let anomaly = self
            .trust
            .observe_request(&claims.session, &fingerprint, request.location)?;

        // Risk.
        let velocity_window = Duration::seconds(self.config.velocity_window_seconds);
        let recent_requests = self.audit.recent_count(
            identity.id,
            now - velocity_window,
            Some(AuditCategory::Authorization),
        ) as u32;

        let context = RiskContext {
            timestamp: now,
            location: request.location,
            amount: request.amount,
            anonymizing_network: request.anonymizing_network,
            recent_requests,
        };
        let assessment = self.risk.score(&context, &device, &session);

        // Attribute bag, risk score injected.
        let satisfied = self.satisfied_step_ups(&session.id);
        let mut attributes = request.attributes.clone();
        attributes.insert(RISK_SCORE_ATTR, assessment.score);
        attributes.insert(
            "roles",
            identity
                .roles
                .iter()
                .map(|r| r.as_str().to_string())
                .collect::<Vec<String>>(),
        );
        attributes.insert("device_trusted", device.trusted);
        attributes.insert("anomaly_detected", anomaly.is_some());
        for factor in &satisfied {
            attributes.insert(step_up_attribute(*factor), true);
        }

        // Policy. Challenge policies whose factor was already satisfied for
        // this session fall through to the remaining rules.
        let policy_decision = self.policy.evaluate_where(
            &request.resource,
            &request.action,
            &attributes,
            |p| {
                !(p.effect == Effect::Challenge
                    && p.step_up.is_some_and(|factor| satisfied.contains(&factor)))
            },
        )?;

        // Audit: decision first.
        let (action, outcome, severity) = match policy_decision.effect {
            Effect::Allow => (
                "authorization_granted",
                AuditOutcome::Success,
                AuditSeverity::Info,
            ),
            Effect::Deny => (
                "authorization_denied",
                AuditOutcome::Denied,
                AuditSeverity::Warning,
            ),
            Effect::Challenge => (
                "authorization_challenged",
                AuditOutcome::Challenged,
                AuditSeverity::Warning,
            ),
        };
        self.audit.append(
            AuditEvent::new(AuditCategory::Authorization, severity, action, outcome, now)
                .with_identity(identity.id)
                .with_session(session.id)
                .with_resource(request.resource.as_str())
                .with_detail(serde_json::json!({
                    "action": request.action,
                    "policy": policy_decision.reason,
                    "risk_score": assessment.score,
                    "risk_level": assessment.level,
                    "anomaly": anomaly.map(|a| a.to_string()),
                })),
        );

        // Outcome update second, after the decision is finalized.
        self.record_trust_outcome(&identity, &session, &device, &policy_decision.effect, anomaly, &assessment);

        Ok(Decision {
            effect: policy_decision.effect,
            policy_id: policy_decision.policy_id,
            risk_score: assessment.score,
            risk_level: assessment.level,
            reason: policy_decision.reason,
            step_up: policy_decision.step_up,
        })
    }

    /// Redeem a refresh token through the compromise-aware path.
    ///
    /// Reuse detection does not stop at the token layer: the session is
    /// invalidated, its step-up grants dropped, and a critical security
    /// event emitted.
    pub fn rotate_credentials(&self, refresh_token: &str) -> Result<TokenPair, EvaluateError> {
        let now = self.clock.now();
        match self.tokens.rotate(refresh_token) {
            Ok(pair) => {
                self.audit.append(
                    AuditEvent::new(
                        AuditCategory::Token,
                        AuditSeverity::Info,
                        "refresh_rotated",
                        AuditOutcome::Success,
                        now,
                    )
                    .with_identity(pair.access.identity)
                    .with_session(pair.access.session),
                );
                Ok(pair)
            }
            Err(TokenError::AlreadyRotated) => {
                if let Ok(claims) = self.tokens.peek(refresh_token) {
                    self.trust.invalidate_session(&claims.session);
                    self.step_ups
                        .lock()
                        .expect("step-up lock")
                        .remove(&claims.session);
                    self.audit.append(
                        AuditEvent::new(
                            AuditCategory::Security,
                            AuditSeverity::Critical,
                            "refresh_reuse_detected",
                            AuditOutcome::Failure,
                            now,
                        )
                        .with_identity(claims.identity)
                        .with_session(claims.session),
                    );
                }
                Err(TokenError::AlreadyRotated.into())
            }
            Err(e) => {
                self.audit.append(
                    AuditEvent::new(
                        AuditCategory::Token,
                        AuditSeverity::Warning,
                        "refresh_rotation_failed",
                        AuditOutcome::Failure,
                        now,
                    )
                    .with_detail(serde_json::json!({"error": e.to_string()})),
                );
                Err(e.into())
            }
        }
    }

    /// Record a completed step-up challenge for a session.
    pub fn satisfy_step_up(&self, session: SessionId, factor: StepUpFactor) {
        self.step_ups
            .lock()
            .expect("step-up lock")
            .entry(session)
            .or_default()
            .insert(factor);

        self.audit.append(
            AuditEvent::new(
                AuditCategory::Authentication,
                AuditSeverity::Info,
                "step_up_satisfied",
                AuditOutcome::Success,
                self.clock.now(),
            )
            .with_session(session)
            .with_detail(serde_json::json!({"factor": factor.to_string()})),
        );
    }

    /// Track a failed authentication attempt against an identity.
    pub fn record_authentication_failure(&self, identity: IdentityId) -> Option<Identity> {
        let updated = self
            .identities
            .record_failure(&identity, self.config.lockout_threshold)?;

        self.audit.append(
            AuditEvent::new(
                AuditCategory::Authentication,
                AuditSeverity::Warning,
                "authentication_failed",
                AuditOutcome::Failure,
                self.clock.now(),
            )
            .with_identity(identity)
            .with_detail(serde_json::json!({
                "failed_attempts": updated.failed_attempts,
                "locked": updated.locked,
            })),
        );

        Some(updated)
    }

    /// Clear the failure counter after a successful authentication.
    pub fn record_authentication_success(&self, identity: IdentityId) -> Option<Identity> {
        let updated = self.identities.record_success(&identity)?;

        self.audit.append(
            AuditEvent::new(
                AuditCategory::Authentication,
                AuditSeverity::Info,
                "authentication_succeeded",
                AuditOutcome::Success,
                self.clock.now(),
            )
            .with_identity(identity),
        );

        Some(updated)
    }

    /// Administrative, terminal revocation of a device's trust.
    pub fn revoke_device(&self, fingerprint: &DeviceFingerprint) -> Option<Device> {
        let device = self
            .trust
            .record_outcome(fingerprint, TrustOutcome::ExplicitRevocation)?;

        self.audit.append(
            AuditEvent::new(
                AuditCategory::Admin,
                AuditSeverity::Warning,
                "device_revoked",
                AuditOutcome::Success,
                self.clock.now(),
            )
            .with_identity(device.identity)
            .with_detail(serde_json::json!({"device": fingerprint.as_str()})),
        );

        Some(device)
    }

    fn satisfied_step_ups(&self, session: &SessionId) -> HashSet<StepUpFactor> {
        self.step_ups
            .lock()
            .expect("step-up lock")
            .get(session)
            .cloned()
            .unwrap_or_default()
    }

    fn record_trust_outcome(
        &self,
        identity: &Identity,
        session: &Session,
        device: &Device,
        effect: &Effect,
        anomaly: Option<vigil_trust::AnomalySignal>,
        assessment: &vigil_risk::RiskAssessment,
    ) {
        let now = self.clock.now();
        match effect {
            Effect::Allow => {
                self.trust
                    .record_outcome(&device.fingerprint, TrustOutcome::BenignAccess);
                self.audit.append(
                    AuditEvent::new(
                        AuditCategory::Session,
                        AuditSeverity::Info,
                        "trust_outcome_recorded",
                        AuditOutcome::Success,
                        now,
                    )
                    .with_identity(identity.id)
                    .with_session(session.id)
                    .with_detail(serde_json::json!({"outcome": "benign_access"})),
                );
            }
            Effect::Deny | Effect::Challenge => {
                let risk_triggered = matches!(
                    assessment.level,
                    vigil_risk::RiskLevel::High | vigil_risk::RiskLevel::Critical
                );
                if anomaly.is_some() || risk_triggered {
                    self.trust
                        .record_outcome(&device.fingerprint, TrustOutcome::AnomalyDetected);
                    self.audit.append(
                        AuditEvent::new(
                            AuditCategory::Security,
                            AuditSeverity::Warning,
                            "trust_outcome_recorded",
                            AuditOutcome::Failure,
                            now,
                        )
                        .with_identity(identity.id)
                        .with_session(session.id)
                        .with_detail(serde_json::json!({
                            "outcome": "anomaly_detected",
                            "anomaly": anomaly.map(|a| a.to_string()),
                            "risk_level": assessment.level,
                        })),
                    );
                }
            }
        }
    }
}

fn step_up_attribute(factor: StepUpFactor) -> &'static str {
    match factor {
        StepUpFactor::Mfa => "mfa_verified",
        StepUpFactor::SecurityQuestion => "security_question_verified",
        StepUpFactor::Reauthentication => "reauthenticated",
    }
}
