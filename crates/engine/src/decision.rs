//! The decision contract.

use serde::{Deserialize, Serialize};

use vigil_core::PolicyId;
use vigil_policy::{Effect, StepUpFactor};
use vigil_risk::RiskLevel;

/// The output of one evaluation. Ephemeral; audited but never persisted by
/// the core itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub effect: Effect,
    pub policy_id: Option<PolicyId>,

    /// Computed request risk. Zero when evaluation failed before scoring.
    pub risk_score: u8,
    pub risk_level: RiskLevel,

    pub reason: String,

    /// The step-up factor a `Challenge` demands.
    pub step_up: Option<StepUpFactor>,
}

impl Decision {
    /// The fail-closed conversion of an error into a decision.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            effect: Effect::Deny,
            policy_id: None,
            risk_score: 0,
            risk_level: RiskLevel::Low,
            reason: reason.into(),
            step_up: None,
        }
    }

    pub fn is_allow(&self) -> bool {
        self.effect == Effect::Allow
    }
}
