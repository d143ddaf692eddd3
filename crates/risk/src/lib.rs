//! `vigil-risk` — per-request risk scoring.
//!
//! A pure function over `(context, device, session)`: independently scored
//! factors, weighted and clamped into a single 0–100 number. The context
//! carries the request timestamp, so scoring is deterministic and
//! replay-safe for audits.

pub mod context;
pub mod engine;
pub mod factor;
pub mod profile;

pub use context::RiskContext;
pub use engine::{RiskAssessment, RiskEngine, RiskLevel};
pub use factor::{FactorScore, RiskFactor};
pub use profile::RiskProfile;
