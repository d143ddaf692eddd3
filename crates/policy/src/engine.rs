//! The policy decision point.

use std::sync::{Arc, RwLock};

use vigil_core::PolicyId;

use crate::attributes::AttributeBag;
use crate::error::PolicyLoadError;
use crate::rule::{Effect, Policy, StepUpFactor};
use crate::snapshot::PolicySnapshot;

/// The outcome of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDecision {
    pub effect: Effect,
    pub policy_id: Option<PolicyId>,
    pub reason: String,
    pub step_up: Option<StepUpFactor>,
}

impl PolicyDecision {
    fn fail_closed() -> Self {
        Self {
            effect: Effect::Deny,
            policy_id: None,
            reason: "no matching policy".to_string(),
            step_up: None,
        }
    }
}

/// Stateless evaluator over an atomically swapped snapshot.
///
/// Readers always see one complete snapshot; a load replaces the whole
/// reference and in-flight evaluations finish against the version they
/// started with.
#[derive(Default)]
pub struct PolicyEngine {
    snapshot: RwLock<Option<Arc<PolicySnapshot>>>,
}

impl PolicyEngine {
    /// An engine with no snapshot; it refuses to evaluate until `load`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: PolicySnapshot) -> Self {
        let engine = Self::new();
        engine.load(snapshot);
        engine
    }

    /// Install a validated snapshot, replacing the previous one whole.
    pub fn load(&self, snapshot: PolicySnapshot) {
        let version = snapshot.version;
        let count = snapshot.policies.len();
        let mut slot = self.snapshot.write().expect("snapshot lock");
        *slot = Some(Arc::new(snapshot));
        drop(slot);
        tracing::info!(version, count, "policy snapshot loaded");
    }

    /// Parse, validate, and install in one step.
    ///
    /// A snapshot that fails any check leaves the current snapshot in
    /// place untouched.
    pub fn load_json(&self, json: &str) -> Result<(), PolicyLoadError> {
        let snapshot = PolicySnapshot::from_json(json)?;
        self.load(snapshot);
        Ok(())
    }

    pub fn current_version(&self) -> Option<u64> {
        let slot = self.snapshot.read().expect("snapshot lock");
        slot.as_ref().map(|s| s.version)
    }

    /// Evaluate a request against the current snapshot.
    ///
    /// Pure with respect to trust state: reads the bag and the snapshot,
    /// mutates nothing. Matching: filter by target pattern, require all
    /// conditions, take the highest priority, break ties toward the most
    /// restrictive effect, and deny when nothing matches.
    pub fn evaluate(
        &self,
        resource: &str,
        action: &str,
        attributes: &AttributeBag,
    ) -> Result<PolicyDecision, PolicyLoadError> {
        self.evaluate_where(resource, action, attributes, |_| true)
    }

    /// `evaluate`, restricted to policies the caller deems eligible.
    ///
    /// Used by the orchestrator to fall through challenge policies whose
    /// step-up factor has already been satisfied for the session.
    pub fn evaluate_where<F>(
        &self,
        resource: &str,
        action: &str,
        attributes: &AttributeBag,
        eligible: F,
    ) -> Result<PolicyDecision, PolicyLoadError>
    where
        F: Fn(&Policy) -> bool,
    {
        let snapshot = {
            let slot = self.snapshot.read().expect("snapshot lock");
            slot.clone().ok_or(PolicyLoadError::NotLoaded)?
        };

        let matched = snapshot
            .policies
            .iter()
            .filter(|p| eligible(p))
            .filter(|p| p.matches_target(resource, action))
            .filter(|p| p.conditions_hold(attributes))
            .max_by_key(|p| (p.priority, p.effect.restrictiveness()));

        let decision = match matched {
            None => PolicyDecision::fail_closed(),
            Some(policy) => PolicyDecision {
                effect: policy.effect,
                policy_id: Some(policy.id.clone()),
                reason: policy.id.to_string(),
                step_up: winning_step_up(policy),
            },
        };

        tracing::debug!(
            resource,
            action,
            effect = %decision.effect,
            policy = decision.reason,
            "policy evaluated"
        );

        Ok(decision)
    }
}

fn winning_step_up(policy: &Policy) -> Option<StepUpFactor> {
    if policy.effect == Effect::Challenge {
        policy.step_up
    } else {
        None
    }
}
