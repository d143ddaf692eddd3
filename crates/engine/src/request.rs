//! The enforcement point's input.

use vigil_policy::AttributeBag;
use vigil_trust::{DeviceAttributes, GeoPoint};

/// Everything one request brings to `evaluate`.
#[derive(Debug, Clone)]
pub struct EvaluateRequest {
    /// Encoded access token presented by the caller.
    pub access_token: String,

    /// Client-supplied device attributes; fingerprinted by the core.
    pub device_attributes: DeviceAttributes,

    pub resource: String,
    pub action: String,

    /// IP-derived location, when the outer layer resolved one.
    pub location: Option<GeoPoint>,

    /// Transaction amount for financial actions.
    pub amount: Option<f64>,

    /// The request arrived via a known anonymizing network.
    pub anonymizing_network: bool,

    /// Caller-supplied context attributes for policy conditions.
    pub attributes: AttributeBag,
}

impl EvaluateRequest {
    pub fn new(
        access_token: impl Into<String>,
        device_attributes: DeviceAttributes,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            device_attributes,
            resource: resource.into(),
            action: action.into(),
            location: None,
            amount: None,
            anonymizing_network: false,
            attributes: AttributeBag::new(),
        }
    }
}
