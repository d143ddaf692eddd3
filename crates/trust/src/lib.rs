//! `vigil-trust` — per-device and per-session trust state.
//!
//! Owns the only mutation path for device trust scores and session liveness.
//! The request path never writes trust state directly; it reports outcomes
//! and the update rule here decides what they mean.

pub mod anomaly;
pub mod config;
pub mod device;
pub mod error;
pub mod geo;
pub mod session;
pub mod store;

pub use anomaly::AnomalySignal;
pub use config::TrustConfig;
pub use device::{Device, DeviceAttributes, TrustOutcome};
pub use error::{SessionError, TrustError};
pub use geo::{GeoPoint, haversine_km};
pub use session::{ObservedLocation, Session};
pub use store::TrustStore;
