//! Session anomaly rule.
//!
//! Lives here rather than in risk scoring because its consequences mutate
//! device and session state; the risk engine only reads the resulting
//! signal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vigil_core::DeviceFingerprint;

use crate::geo::{GeoPoint, haversine_km};
use crate::session::Session;

/// Why a request was flagged anomalous.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalySignal {
    /// The implied travel speed from the session's last known location is
    /// physically implausible.
    ImpossibleTravel { speed_kmh: f64 },

    /// The presented fingerprint differs from the one bound at session
    /// creation.
    DeviceMismatch,
}

impl core::fmt::Display for AnomalySignal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AnomalySignal::ImpossibleTravel { speed_kmh } => {
                write!(f, "impossible travel ({speed_kmh:.0} km/h)")
            }
            AnomalySignal::DeviceMismatch => f.write_str("device mismatch"),
        }
    }
}

/// Evaluate the anomaly rule for one request against session state.
///
/// Device mismatch wins over travel analysis; a different device makes the
/// location comparison meaningless.
pub fn detect(
    session: &Session,
    fingerprint: &DeviceFingerprint,
    location: Option<GeoPoint>,
    now: DateTime<Utc>,
    max_travel_speed_kmh: f64,
) -> Option<AnomalySignal> {
    if *fingerprint != session.device {
        return Some(AnomalySignal::DeviceMismatch);
    }

    let (current, last) = match (location, session.last_location) {
        (Some(current), Some(last)) => (current, last),
        _ => return None,
    };

    let distance_km = haversine_km(last.point, current.point);
    let elapsed = now - last.at;
    let elapsed_hours = elapsed.num_milliseconds() as f64 / 3_600_000.0;

    if elapsed_hours <= 0.0 {
        // Same instant (or skewed timestamps): any real displacement is
        // already implausible.
        if distance_km > 1.0 {
            return Some(AnomalySignal::ImpossibleTravel {
                speed_kmh: f64::INFINITY,
            });
        }
        return None;
    }

    let speed_kmh = distance_km / elapsed_hours;
    if speed_kmh > max_travel_speed_kmh {
        return Some(AnomalySignal::ImpossibleTravel { speed_kmh });
    }

    None
}
