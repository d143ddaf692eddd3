//! Wire encoding for signed tokens.
//!
//! Format: `hex(claims_json) "." hex(signature)`. The signature covers the
//! serialized claims bytes exactly as transmitted.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::TokenError;
use crate::signer::TokenSigner;

pub fn encode_token<T, S>(claims: &T, signer: &S) -> Result<String, TokenError>
where
    T: Serialize,
    S: TokenSigner + ?Sized,
{
    let payload = serde_json::to_vec(claims)
        .map_err(|e| TokenError::malformed(format!("claims serialization failed: {e}")))?;
    let signature = signer.sign(&payload);
    Ok(format!("{}.{}", hex::encode(payload), hex::encode(signature)))
}

pub fn decode_token<T, S>(token: &str, signer: &S) -> Result<T, TokenError>
where
    T: DeserializeOwned,
    S: TokenSigner + ?Sized,
{
    let (payload_hex, signature_hex) = token
        .split_once('.')
        .ok_or_else(|| TokenError::malformed("missing signature separator"))?;

    let payload =
        hex::decode(payload_hex).map_err(|_| TokenError::malformed("payload is not hex"))?;
    let signature =
        hex::decode(signature_hex).map_err(|_| TokenError::malformed("signature is not hex"))?;

    if !signer.verify(&payload, &signature) {
        return Err(TokenError::malformed("signature mismatch"));
    }

    serde_json::from_slice(&payload)
        .map_err(|e| TokenError::malformed(format!("claims deserialization failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{TokenClaims, TokenKind};
    use crate::signer::HmacSha256Signer;
    use chrono::{Duration, Utc};
    use vigil_core::{DeviceFingerprint, IdentityId, SessionId, TokenId};

    fn sample_claims() -> TokenClaims {
        let now = Utc::now();
        TokenClaims {
            kind: TokenKind::Access,
            token_id: TokenId::new(),
            identity: IdentityId::new(),
            session: SessionId::new(),
            device: DeviceFingerprint::new("cd".repeat(32)),
            roles: vec![],
            issued_at: now,
            expires_at: now + Duration::minutes(15),
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let signer = HmacSha256Signer::new(b"secret".to_vec());
        let claims = sample_claims();

        let token = encode_token(&claims, &signer).unwrap();
        let decoded: TokenClaims = decode_token(&token, &signer).unwrap();

        assert_eq!(claims, decoded);
    }

    #[test]
    fn flipped_payload_byte_is_malformed() {
        let signer = HmacSha256Signer::new(b"secret".to_vec());
        let token = encode_token(&sample_claims(), &signer).unwrap();

        // Flip one hex digit of the payload half.
        let mut chars: Vec<char> = token.chars().collect();
        chars[0] = if chars[0] == 'a' { 'b' } else { 'a' };
        let tampered: String = chars.into_iter().collect();

        let result: Result<TokenClaims, _> = decode_token(&tampered, &signer);
        assert!(matches!(result, Err(TokenError::Malformed(_))));
    }

    #[test]
    fn token_without_separator_is_malformed() {
        let signer = HmacSha256Signer::new(b"secret".to_vec());
        let result: Result<TokenClaims, _> = decode_token("deadbeef", &signer);
        assert!(matches!(result, Err(TokenError::Malformed(_))));
    }

    #[test]
    fn token_signed_with_other_key_is_malformed() {
        let signer = HmacSha256Signer::new(b"key-a".to_vec());
        let other = HmacSha256Signer::new(b"key-b".to_vec());
        let token = encode_token(&sample_claims(), &signer).unwrap();

        let result: Result<TokenClaims, _> = decode_token(&token, &other);
        assert!(matches!(result, Err(TokenError::Malformed(_))));
    }
}
