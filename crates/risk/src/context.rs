//! Scoring input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vigil_trust::GeoPoint;

/// Everything the risk engine may look at for one request.
///
/// The timestamp is supplied by the caller; the engine never reads a clock
/// of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskContext {
    pub timestamp: DateTime<Utc>,

    /// IP-derived location, when resolution succeeded.
    pub location: Option<GeoPoint>,

    /// Transaction amount for financial actions.
    pub amount: Option<f64>,

    /// The request arrived via a known anonymizing network (Tor, open
    /// proxy, flagged VPN range).
    pub anonymizing_network: bool,

    /// Requests seen for this identity within the velocity window.
    pub recent_requests: u32,
}

impl RiskContext {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            location: None,
            amount: None,
            anonymizing_network: false,
            recent_requests: 0,
        }
    }
}
