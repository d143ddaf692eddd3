//! `vigil-policy` — attribute-based policy evaluation.
//!
//! A stateless, fail-closed evaluator over versioned, immutable policy
//! snapshots. The rule grammar is fixed and small: pattern match on
//! resource/action, a closed set of condition kinds, an effect, a priority.

pub mod attributes;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod rule;
pub mod snapshot;

pub use attributes::{AttrValue, AttributeBag};
pub use engine::{PolicyDecision, PolicyEngine};
pub use error::PolicyLoadError;
pub use pattern::Pattern;
pub use rule::{Condition, Effect, Policy, StepUpFactor};
pub use snapshot::PolicySnapshot;

/// Attribute key under which the computed risk score is injected.
pub const RISK_SCORE_ATTR: &str = "risk_score";
