//! `vigil-core` — shared foundation for the decision core.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the identity record, the injectable clock
//! capability, and the dependency-error vocabulary shared by every component.

pub mod clock;
pub mod error;
pub mod id;
pub mod identity;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DependencyError, DependencyResult};
pub use id::{DeviceFingerprint, IdentityId, PolicyId, SessionId, TokenId};
pub use identity::{Identity, IdentityDirectory, Role};
