//! Token signing capability.
//!
//! Signature verification is a capability call so production deployments can
//! back it with a key-management service; the HMAC implementation here is
//! the default collaborator.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies token payloads.
pub trait TokenSigner: Send + Sync {
    fn sign(&self, payload: &[u8]) -> Vec<u8>;

    fn verify(&self, payload: &[u8], signature: &[u8]) -> bool;
}

impl<S> TokenSigner for std::sync::Arc<S>
where
    S: TokenSigner + ?Sized,
{
    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        (**self).sign(payload)
    }

    fn verify(&self, payload: &[u8], signature: &[u8]) -> bool {
        (**self).verify(payload, signature)
    }
}

/// HMAC-SHA-256 signer over a shared secret.
#[derive(Clone)]
pub struct HmacSha256Signer {
    key: Vec<u8>,
}

impl HmacSha256Signer {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length.
        HmacSha256::new_from_slice(&self.key).expect("hmac key")
    }
}

impl core::fmt::Debug for HmacSha256Signer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never expose key material in debug output.
        f.debug_struct("HmacSha256Signer").finish_non_exhaustive()
    }
}

impl TokenSigner for HmacSha256Signer {
    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    fn verify(&self, payload: &[u8], signature: &[u8]) -> bool {
        let mut mac = self.mac();
        mac.update(payload);
        mac.verify_slice(signature).is_ok()
    }
}
