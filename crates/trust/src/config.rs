//! Trust-store tunables.
//!
//! None of these are protocol constants; deployments adjust them without
//! touching code.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Score assigned to a device on first sighting.
    #[serde(default = "default_initial_score")]
    pub initial_score: u8,

    /// Increment per benign access (at most once per access).
    #[serde(default = "default_benign_step")]
    pub benign_step: u8,

    /// Decrement per detected anomaly.
    #[serde(default = "default_anomaly_step")]
    pub anomaly_step: u8,

    /// Below this score a device loses its trusted flag.
    #[serde(default = "default_trusted_floor")]
    pub trusted_floor: u8,

    /// At or above this score a device earns its trusted flag.
    #[serde(default = "default_promote_threshold")]
    pub promote_threshold: u8,

    /// Maximum concurrent sessions per identity.
    #[serde(default = "default_session_cap")]
    pub session_cap: usize,

    /// Session lifetime in minutes.
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,

    /// Travel speed above which a location change is physically implausible.
    #[serde(default = "default_max_travel_speed_kmh")]
    pub max_travel_speed_kmh: f64,
}

fn default_initial_score() -> u8 {
    50
}

fn default_benign_step() -> u8 {
    1
}

fn default_anomaly_step() -> u8 {
    20
}

fn default_trusted_floor() -> u8 {
    30
}

fn default_promote_threshold() -> u8 {
    70
}

fn default_session_cap() -> usize {
    5
}

fn default_session_ttl_minutes() -> i64 {
    30
}

fn default_max_travel_speed_kmh() -> f64 {
    900.0
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            initial_score: default_initial_score(),
            benign_step: default_benign_step(),
            anomaly_step: default_anomaly_step(),
            trusted_floor: default_trusted_floor(),
            promote_threshold: default_promote_threshold(),
            session_cap: default_session_cap(),
            session_ttl_minutes: default_session_ttl_minutes(),
            max_travel_speed_kmh: default_max_travel_speed_kmh(),
        }
    }
}
