//! Weighted combination of factor scores.

use serde::{Deserialize, Serialize};

use vigil_trust::{Device, Session};

use crate::context::RiskContext;
use crate::factor::{FactorScore, RiskFactor};
use crate::profile::RiskProfile;

/// Presentation band for a risk score.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=29 => RiskLevel::Low,
            30..=59 => RiskLevel::Medium,
            60..=79 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

impl core::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RiskLevel::Low => f.write_str("low"),
            RiskLevel::Medium => f.write_str("medium"),
            RiskLevel::High => f.write_str("high"),
            RiskLevel::Critical => f.write_str("critical"),
        }
    }
}

/// The result of scoring one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: RiskLevel,
    pub contributions: Vec<FactorScore>,
}

pub struct RiskEngine {
    profile: RiskProfile,
}

impl RiskEngine {
    pub fn new(profile: RiskProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &RiskProfile {
        &self.profile
    }

    /// Score one request. Pure: identical inputs produce identical output.
    pub fn score(
        &self,
        context: &RiskContext,
        device: &Device,
        session: &Session,
    ) -> RiskAssessment {
        let contributions: Vec<FactorScore> = RiskFactor::ALL
            .iter()
            .map(|factor| FactorScore {
                factor: *factor,
                score: factor.score(context, device, session, &self.profile),
                weight: self.profile.weight(*factor),
            })
            .collect();

        let weighted_sum: f64 = contributions
            .iter()
            .map(|c| c.weight.max(0.0) * f64::from(c.score))
            .sum();

        let score = weighted_sum.clamp(0.0, 100.0).round() as u8;
        let level = RiskLevel::from_score(score);

        tracing::debug!(score, %level, "risk assessed");

        RiskAssessment {
            score,
            level,
            contributions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use vigil_core::{DeviceFingerprint, IdentityId};
    use vigil_trust::{GeoPoint, ObservedLocation};

    fn fixture() -> (RiskContext, Device, Session) {
        // Midday keeps the time-of-day factor neutral.
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        let fingerprint = DeviceFingerprint::new("ab".repeat(32));
        let identity = IdentityId::new();
        let device = Device::new(fingerprint.clone(), identity, 100, now);
        let session = Session::new(identity, fingerprint, now, chrono::Duration::minutes(30));
        (RiskContext::new(now), device, session)
    }

    #[test]
    fn all_neutral_factors_score_zero() {
        let (context, mut device, session) = fixture();
        device.trust_score = 100;

        let engine = RiskEngine::new(RiskProfile::default());
        let assessment = engine.score(&context, &device, &session);

        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.level, RiskLevel::Low);
    }

    #[test]
    fn trusted_device_with_default_score_is_low_risk() {
        let (context, mut device, session) = fixture();
        device.trust_score = 80;

        let engine = RiskEngine::new(RiskProfile::default());
        let assessment = engine.score(&context, &device, &session);

        // Only the device factor contributes: (100-80) * 0.30.
        assert_eq!(assessment.score, 6);
        assert_eq!(assessment.level, RiskLevel::Low);
    }

    #[test]
    fn distrusted_device_with_hostile_context_is_high_risk() {
        let (mut context, mut device, mut session) = fixture();
        device.trust_score = 10;
        session.last_location = Some(ObservedLocation {
            point: GeoPoint::new(52.52, 13.405),
            at: context.timestamp - chrono::Duration::hours(1),
        });
        context.location = Some(GeoPoint::new(-33.8688, 151.2093));
        context.anonymizing_network = true;
        context.recent_requests = 90;

        let engine = RiskEngine::new(RiskProfile::default());
        let assessment = engine.score(&context, &device, &session);

        // 90*0.30 + 100*0.20 + 100*0.15 + 100*0.15 = 77
        assert_eq!(assessment.score, 77);
        assert_eq!(assessment.level, RiskLevel::High);
    }

    #[test]
    fn scoring_is_deterministic() {
        let (mut context, device, session) = fixture();
        context.amount = Some(2_500.0);
        context.recent_requests = 7;

        let engine = RiskEngine::new(RiskProfile::default());
        let first = engine.score(&context, &device, &session);
        let second = engine.score(&context, &device, &session);

        assert_eq!(first, second);
    }

    #[test]
    fn contributions_cover_every_factor() {
        let (context, device, session) = fixture();
        let engine = RiskEngine::new(RiskProfile::default());
        let assessment = engine.score(&context, &device, &session);

        assert_eq!(assessment.contributions.len(), RiskFactor::ALL.len());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// The combined score stays within [0, 100] for arbitrary inputs
            /// and weights.
            #[test]
            fn score_is_always_clamped(
                trust in 0u8..=100,
                amount in proptest::option::of(0.0f64..1_000_000.0),
                recent in 0u32..10_000,
                anonymizing in any::<bool>(),
                weight_scale in 0.0f64..10.0
            ) {
                let (mut context, mut device, session) = fixture();
                device.trust_score = trust;
                context.amount = amount;
                context.recent_requests = recent;
                context.anonymizing_network = anonymizing;

                let mut profile = RiskProfile::default();
                profile.device_trust_weight *= weight_scale;
                profile.anonymizing_network_weight *= weight_scale;

                let engine = RiskEngine::new(profile);
                let assessment = engine.score(&context, &device, &session);
                prop_assert!(assessment.score <= 100);
            }
        }
    }
}
