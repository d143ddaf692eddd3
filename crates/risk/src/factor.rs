//! Risk factors.
//!
//! Each factor maps `(context, device, session)` to a normalized [0,100]
//! score, independently of the others. Time-based rules read the context
//! timestamp only.

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use vigil_trust::{Device, Session, haversine_km};

use crate::context::RiskContext;
use crate::profile::RiskProfile;

/// The closed set of scoring factors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    DeviceTrust,
    GeoVelocity,
    TimeOfDay,
    TransactionAmount,
    AnonymizingNetwork,
    RequestVelocity,
}

impl RiskFactor {
    pub const ALL: [RiskFactor; 6] = [
        RiskFactor::DeviceTrust,
        RiskFactor::GeoVelocity,
        RiskFactor::TimeOfDay,
        RiskFactor::TransactionAmount,
        RiskFactor::AnonymizingNetwork,
        RiskFactor::RequestVelocity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RiskFactor::DeviceTrust => "device_trust",
            RiskFactor::GeoVelocity => "geo_velocity",
            RiskFactor::TimeOfDay => "time_of_day",
            RiskFactor::TransactionAmount => "transaction_amount",
            RiskFactor::AnonymizingNetwork => "anonymizing_network",
            RiskFactor::RequestVelocity => "request_velocity",
        }
    }

    /// Normalized [0,100] score for this factor.
    pub fn score(
        &self,
        context: &RiskContext,
        device: &Device,
        session: &Session,
        profile: &RiskProfile,
    ) -> u8 {
        match self {
            RiskFactor::DeviceTrust => 100 - device.trust_score.min(100),

            RiskFactor::GeoVelocity => {
                let (current, last) = match (context.location, session.last_location) {
                    (Some(current), Some(last)) => (current, last),
                    _ => return 0,
                };

                let distance_km = haversine_km(last.point, current.point);
                let elapsed = context.timestamp - last.at;
                let elapsed_hours = elapsed.num_milliseconds() as f64 / 3_600_000.0;

                if elapsed_hours <= 0.0 {
                    return if distance_km > 1.0 { 100 } else { 0 };
                }

                let speed = distance_km / elapsed_hours;
                ratio_score(speed, profile.max_travel_speed_kmh)
            }

            RiskFactor::TimeOfDay => {
                let hour = context.timestamp.hour();
                if hour >= profile.unusual_hours_start && hour < profile.unusual_hours_end {
                    100
                } else {
                    0
                }
            }

            RiskFactor::TransactionAmount => match context.amount {
                Some(amount) if amount > 0.0 => ratio_score(amount, profile.high_amount_threshold),
                _ => 0,
            },

            RiskFactor::AnonymizingNetwork => {
                if context.anonymizing_network {
                    100
                } else {
                    0
                }
            }

            RiskFactor::RequestVelocity => {
                ratio_score(context.recent_requests as f64, profile.velocity_threshold as f64)
            }
        }
    }
}

/// A factor's contribution to one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub factor: RiskFactor,
    pub score: u8,
    pub weight: f64,
}

/// Linear ramp saturating at `saturation`.
fn ratio_score(value: f64, saturation: f64) -> u8 {
    if saturation <= 0.0 {
        return 0;
    }
    ((value / saturation) * 100.0).clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use vigil_core::{DeviceFingerprint, IdentityId};
    use vigil_trust::{GeoPoint, ObservedLocation};

    fn fixture() -> (RiskContext, Device, Session, RiskProfile) {
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        let fingerprint = DeviceFingerprint::new("ab".repeat(32));
        let identity = IdentityId::new();
        let device = Device::new(fingerprint.clone(), identity, 50, now);
        let session = Session::new(identity, fingerprint, now, chrono::Duration::minutes(30));
        (
            RiskContext::new(now),
            device,
            session,
            RiskProfile::default(),
        )
    }

    #[test]
    fn device_trust_factor_is_inverse_of_score() {
        let (context, mut device, session, profile) = fixture();

        device.trust_score = 100;
        assert_eq!(
            RiskFactor::DeviceTrust.score(&context, &device, &session, &profile),
            0
        );

        device.trust_score = 10;
        assert_eq!(
            RiskFactor::DeviceTrust.score(&context, &device, &session, &profile),
            90
        );
    }

    #[test]
    fn geo_velocity_is_zero_without_a_prior_location() {
        let (mut context, device, session, profile) = fixture();
        context.location = Some(GeoPoint::new(52.52, 13.405));
        assert_eq!(
            RiskFactor::GeoVelocity.score(&context, &device, &session, &profile),
            0
        );
    }

    #[test]
    fn geo_velocity_saturates_on_impossible_travel() {
        let (mut context, device, mut session, profile) = fixture();
        session.last_location = Some(ObservedLocation {
            point: GeoPoint::new(52.52, 13.405),
            at: context.timestamp - chrono::Duration::hours(1),
        });
        context.location = Some(GeoPoint::new(-33.8688, 151.2093));

        assert_eq!(
            RiskFactor::GeoVelocity.score(&context, &device, &session, &profile),
            100
        );
    }

    #[test]
    fn time_of_day_flags_the_unusual_window() {
        let (mut context, device, session, profile) = fixture();

        context.timestamp = Utc.with_ymd_and_hms(2024, 6, 3, 3, 0, 0).unwrap();
        assert_eq!(
            RiskFactor::TimeOfDay.score(&context, &device, &session, &profile),
            100
        );

        context.timestamp = Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap();
        assert_eq!(
            RiskFactor::TimeOfDay.score(&context, &device, &session, &profile),
            0
        );
    }

    #[test]
    fn transaction_amount_ramps_to_saturation() {
        let (mut context, device, session, profile) = fixture();

        assert_eq!(
            RiskFactor::TransactionAmount.score(&context, &device, &session, &profile),
            0
        );

        context.amount = Some(5_000.0);
        assert_eq!(
            RiskFactor::TransactionAmount.score(&context, &device, &session, &profile),
            50
        );

        context.amount = Some(50_000.0);
        assert_eq!(
            RiskFactor::TransactionAmount.score(&context, &device, &session, &profile),
            100
        );
    }

    #[test]
    fn request_velocity_ramps_with_recent_requests() {
        let (mut context, device, session, profile) = fixture();

        context.recent_requests = 15;
        assert_eq!(
            RiskFactor::RequestVelocity.score(&context, &device, &session, &profile),
            50
        );

        context.recent_requests = 90;
        assert_eq!(
            RiskFactor::RequestVelocity.score(&context, &device, &session, &profile),
            100
        );
    }

    #[test]
    fn anonymizing_network_is_binary() {
        let (mut context, device, session, profile) = fixture();
        assert_eq!(
            RiskFactor::AnonymizingNetwork.score(&context, &device, &session, &profile),
            0
        );

        context.anonymizing_network = true;
        assert_eq!(
            RiskFactor::AnonymizingNetwork.score(&context, &device, &session, &profile),
            100
        );
    }
}
