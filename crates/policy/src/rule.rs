//! The fixed rule grammar.

use serde::{Deserialize, Serialize};

use vigil_core::PolicyId;

use crate::attributes::{AttrValue, AttributeBag};
use crate::pattern::Pattern;

/// Step-up verification factor a `Challenge` decision demands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepUpFactor {
    Mfa,
    SecurityQuestion,
    Reauthentication,
}

impl core::fmt::Display for StepUpFactor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StepUpFactor::Mfa => f.write_str("mfa"),
            StepUpFactor::SecurityQuestion => f.write_str("security_question"),
            StepUpFactor::Reauthentication => f.write_str("reauthentication"),
        }
    }
}

/// Policy effect.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Allow,
    Deny,
    Challenge,
}

impl Effect {
    /// Restrictiveness rank for equal-priority tie-breaking:
    /// Deny beats Challenge beats Allow.
    pub fn restrictiveness(&self) -> u8 {
        match self {
            Effect::Allow => 0,
            Effect::Challenge => 1,
            Effect::Deny => 2,
        }
    }
}

impl core::fmt::Display for Effect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Effect::Allow => f.write_str("allow"),
            Effect::Deny => f.write_str("deny"),
            Effect::Challenge => f.write_str("challenge"),
        }
    }
}

/// One attribute condition.
///
/// The set of kinds is closed; unknown kinds fail snapshot deserialization
/// rather than silently evaluating to anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// The attribute is present and equal to `value`.
    Equals { attribute: String, value: AttrValue },

    /// The attribute is a string contained in `values`, or a string list
    /// sharing at least one element with `values`.
    OneOf {
        attribute: String,
        values: Vec<String>,
    },

    /// The attribute is numeric and within `[min, max]` (either bound
    /// optional, both inclusive).
    Threshold {
        attribute: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
}

impl Condition {
    /// Whether the condition holds against the bag.
    ///
    /// A missing or mistyped attribute never holds.
    pub fn holds(&self, bag: &AttributeBag) -> bool {
        match self {
            Condition::Equals { attribute, value } => bag.get(attribute) == Some(value),

            Condition::OneOf { attribute, values } => match bag.get(attribute) {
                Some(AttrValue::Text(text)) => values.iter().any(|v| v == text),
                Some(AttrValue::TextList(list)) => {
                    values.iter().any(|v| list.iter().any(|item| item == v))
                }
                _ => false,
            },

            Condition::Threshold {
                attribute,
                min,
                max,
            } => {
                let Some(value) = bag.get(attribute).and_then(AttrValue::as_number) else {
                    return false;
                };
                if let Some(min) = min {
                    if value < *min {
                        return false;
                    }
                }
                if let Some(max) = max {
                    if value > *max {
                        return false;
                    }
                }
                true
            }
        }
    }
}

/// One ordered rule in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub resource: Pattern,
    pub action: Pattern,

    #[serde(default)]
    pub conditions: Vec<Condition>,

    pub effect: Effect,

    /// Required for `Challenge`; validated at load time.
    #[serde(default)]
    pub step_up: Option<StepUpFactor>,

    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub description: Option<String>,
}

impl Policy {
    pub fn matches_target(&self, resource: &str, action: &str) -> bool {
        self.resource.matches(resource) && self.action.matches(action)
    }

    /// All conditions must hold; an empty set always holds.
    pub fn conditions_hold(&self, bag: &AttributeBag) -> bool {
        self.conditions.iter().all(|c| c.holds(bag))
    }
}
