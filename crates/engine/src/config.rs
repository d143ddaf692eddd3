//! Aggregated engine configuration.
//!
//! Loaded all-or-nothing: a config document that fails to parse leaves
//! nothing partially applied.

use serde::{Deserialize, Serialize};

use vigil_risk::RiskProfile;
use vigil_token::TokenConfig;
use vigil_trust::TrustConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub token: TokenConfig,

    #[serde(default)]
    pub trust: TrustConfig,

    #[serde(default)]
    pub risk: RiskProfile,

    /// Failed authentication attempts before an identity is locked.
    #[serde(default = "default_lockout_threshold")]
    pub lockout_threshold: u32,

    /// Window for the request-velocity signal, in seconds.
    #[serde(default = "default_velocity_window_seconds")]
    pub velocity_window_seconds: i64,
}

fn default_lockout_threshold() -> u32 {
    5
}

fn default_velocity_window_seconds() -> i64 {
    60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            token: TokenConfig::default(),
            trust: TrustConfig::default(),
            risk: RiskProfile::default(),
            lockout_threshold: default_lockout_threshold(),
            velocity_window_seconds: default_velocity_window_seconds(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
