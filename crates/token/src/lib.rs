//! `vigil-token` — bearer credential lifecycle.
//!
//! Issues, verifies, rotates, and revokes the short-lived access / long-lived
//! refresh token pair bound to an identity and session. Signature and clock
//! are injected capabilities; the crate performs no IO.

pub mod claims;
pub mod codec;
pub mod error;
pub mod manager;
pub mod revocation;
pub mod signer;

pub use claims::{TokenClaims, TokenKind, validate_window};
pub use codec::{decode_token, encode_token};
pub use error::TokenError;
pub use manager::{TokenConfig, TokenManager, TokenPair};
pub use revocation::RevocationSet;
pub use signer::{HmacSha256Signer, TokenSigner};
