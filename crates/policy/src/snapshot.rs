//! Versioned policy snapshots.
//!
//! A snapshot is parsed and validated as a whole before it can be installed;
//! a snapshot that fails any check is rejected entirely, never partially
//! applied.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::PolicyLoadError;
use crate::rule::{Condition, Effect, Policy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub version: u64,
    pub policies: Vec<Policy>,
}

impl PolicySnapshot {
    pub fn from_json(json: &str) -> Result<Self, PolicyLoadError> {
        let snapshot: PolicySnapshot =
            serde_json::from_str(json).map_err(|e| PolicyLoadError::Malformed(e.to_string()))?;
        snapshot.validated()
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, PolicyLoadError> {
        let snapshot: PolicySnapshot =
            serde_json::from_value(value).map_err(|e| PolicyLoadError::Malformed(e.to_string()))?;
        snapshot.validated()
    }

    /// Structural checks beyond what the grammar enforces.
    pub fn validated(self) -> Result<Self, PolicyLoadError> {
        let mut seen = HashSet::new();
        for policy in &self.policies {
            if !seen.insert(policy.id.as_str()) {
                return Err(PolicyLoadError::Invalid(format!(
                    "duplicate policy id '{}'",
                    policy.id
                )));
            }

            if policy.resource.as_str().is_empty() || policy.action.as_str().is_empty() {
                return Err(PolicyLoadError::Invalid(format!(
                    "policy '{}' has an empty target pattern",
                    policy.id
                )));
            }

            if policy.effect == Effect::Challenge && policy.step_up.is_none() {
                return Err(PolicyLoadError::Invalid(format!(
                    "challenge policy '{}' names no step-up factor",
                    policy.id
                )));
            }

            for condition in &policy.conditions {
                if let Condition::Threshold {
                    attribute,
                    min: None,
                    max: None,
                } = condition
                {
                    return Err(PolicyLoadError::Invalid(format!(
                        "policy '{}' has an unbounded threshold on '{attribute}'",
                        policy.id
                    )));
                }
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "version": 3,
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

    #[test]
    fn valid_snapshot_parses() {
        let snapshot = PolicySnapshot::from_json(VALID).unwrap();
        assert_eq!(snapshot.version, 3);
        assert_eq!(snapshot.policies.len(), 2);
    }

    #[test]
    fn broken_json_is_malformed() {
        let result = PolicySnapshot::from_json("{\"version\": 1, \"policies\": [");
        assert!(matches!(result, Err(PolicyLoadError::Malformed(_))));
    }

    #[test]
    fn unknown_condition_kind_is_malformed() {
        let result = PolicySnapshot::from_json(
            r#"{
                "version": 1,
                "policies": [{
                    "id": "p",
                    "resource": "*",
                    "action": "*",
                    "conditions": [{"kind": "regex", "attribute": "a", "value": ".*"}],
                    "effect": "deny"
                }]
            }"#,
        );
        assert!(matches!(result, Err(PolicyLoadError::Malformed(_))));
    }

    #[test]
    fn duplicate_policy_ids_are_invalid() {
        let result = PolicySnapshot::from_json(
            r#"{
                "version": 1,
                "policies": [
                    {"id": "p", "resource": "*", "action": "*", "effect": "deny"},
                    {"id": "p", "resource": "*", "action": "*", "effect": "allow"}
                ]
            }"#,
        );
        assert!(matches!(result, Err(PolicyLoadError::Invalid(_))));
    }

    #[test]
    fn challenge_without_step_up_is_invalid() {
        let result = PolicySnapshot::from_json(
            r#"{
                "version": 1,
                "policies": [
                    {"id": "p", "resource": "*", "action": "*", "effect": "challenge"}
                ]
            }"#,
        );
        assert!(matches!(result, Err(PolicyLoadError::Invalid(_))));
    }

    #[test]
    fn unbounded_threshold_is_invalid() {
        let result = PolicySnapshot::from_json(
            r#"{
                "version": 1,
                "policies": [{
                    "id": "p",
                    "resource": "*",
                    "action": "*",
                    "conditions": [{"kind": "threshold", "attribute": "risk_score"}],
                    "effect": "deny"
                }]
            }"#,
        );
        assert!(matches!(result, Err(PolicyLoadError::Invalid(_))));
    }
}
