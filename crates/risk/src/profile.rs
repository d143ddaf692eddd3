//! Risk weighting profile.
//!
//! Weights and thresholds are deployment configuration. The default profile
//! favors device trust and travel signals over time-of-day.

use serde::{Deserialize, Serialize};

use crate::factor::RiskFactor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskProfile {
    #[serde(default = "default_device_trust_weight")]
    pub device_trust_weight: f64,

    #[serde(default = "default_geo_velocity_weight")]
    pub geo_velocity_weight: f64,

    #[serde(default = "default_time_of_day_weight")]
    pub time_of_day_weight: f64,

    #[serde(default = "default_transaction_amount_weight")]
    pub transaction_amount_weight: f64,

    #[serde(default = "default_anonymizing_network_weight")]
    pub anonymizing_network_weight: f64,

    #[serde(default = "default_request_velocity_weight")]
    pub request_velocity_weight: f64,

    /// Amount at which the transaction factor saturates.
    #[serde(default = "default_high_amount_threshold")]
    pub high_amount_threshold: f64,

    /// Requests per velocity window at which the velocity factor saturates.
    #[serde(default = "default_velocity_threshold")]
    pub velocity_threshold: u32,

    /// Start of the unusual-hours window (UTC hour, inclusive).
    #[serde(default = "default_unusual_hours_start")]
    pub unusual_hours_start: u32,

    /// End of the unusual-hours window (UTC hour, exclusive).
    #[serde(default = "default_unusual_hours_end")]
    pub unusual_hours_end: u32,

    /// Travel speed at which the geo factor saturates.
    #[serde(default = "default_max_travel_speed_kmh")]
    pub max_travel_speed_kmh: f64,
}

fn default_device_trust_weight() -> f64 {
    0.30
}

fn default_geo_velocity_weight() -> f64 {
    0.20
}

fn default_time_of_day_weight() -> f64 {
    0.10
}

fn default_transaction_amount_weight() -> f64 {
    0.10
}

fn default_anonymizing_network_weight() -> f64 {
    0.15
}

fn default_request_velocity_weight() -> f64 {
    0.15
}

fn default_high_amount_threshold() -> f64 {
    10_000.0
}

fn default_velocity_threshold() -> u32 {
    30
}

fn default_unusual_hours_start() -> u32 {
    1
}

fn default_unusual_hours_end() -> u32 {
    6
}

fn default_max_travel_speed_kmh() -> f64 {
    900.0
}

impl Default for RiskProfile {
    fn default() -> Self {
        Self {
            device_trust_weight: default_device_trust_weight(),
            geo_velocity_weight: default_geo_velocity_weight(),
            time_of_day_weight: default_time_of_day_weight(),
            transaction_amount_weight: default_transaction_amount_weight(),
            anonymizing_network_weight: default_anonymizing_network_weight(),
            request_velocity_weight: default_request_velocity_weight(),
            high_amount_threshold: default_high_amount_threshold(),
            velocity_threshold: default_velocity_threshold(),
            unusual_hours_start: default_unusual_hours_start(),
            unusual_hours_end: default_unusual_hours_end(),
            max_travel_speed_kmh: default_max_travel_speed_kmh(),
        }
    }
}

impl RiskProfile {
    pub fn weight(&self, factor: RiskFactor) -> f64 {
        match factor {
            RiskFactor::DeviceTrust => self.device_trust_weight,
            RiskFactor::GeoVelocity => self.geo_velocity_weight,
            RiskFactor::TimeOfDay => self.time_of_day_weight,
            RiskFactor::TransactionAmount => self.transaction_amount_weight,
            RiskFactor::AnonymizingNetwork => self.anonymizing_network_weight,
            RiskFactor::RequestVelocity => self.request_velocity_weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_favors_device_trust_over_time_of_day() {
        let profile = RiskProfile::default();
        assert!(profile.device_trust_weight > profile.time_of_day_weight);
        assert!(profile.geo_velocity_weight > profile.time_of_day_weight);
    }

    #[test]
    fn default_weights_sum_to_one() {
        let profile = RiskProfile::default();
        let total: f64 = RiskFactor::ALL
            .iter()
            .map(|f| profile.weight(*f))
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
