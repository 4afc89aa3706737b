//! Encoding of the pending authorization request into the upstream `state`.
//!
//! Unsigned: standard base64 of the JSON. Signed (when a secret is configured):
//! `base64url(json).base64url(hmac_sha256(secret, json))`.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AuthError;
use crate::provider::AuthRequest;

type HmacSha256 = Hmac<Sha256>;

/// Encodes and decodes [`AuthRequest`] state blobs.
#[derive(Clone)]
pub struct StateCodec {
    secret: Option<Vec<u8>>,
}

impl StateCodec {
    /// Create a codec, signing state when `secret` is non-empty.
    #[must_use]
    pub fn new(secret: Option<&str>) -> Self {
        Self { secret: secret.filter(|s| !s.is_empty()).map(|s| s.as_bytes().to_vec()) }
    }

    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.secret.is_some()
    }

    fn mac(secret: &[u8]) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(secret).map_err(|_| AuthError::InvalidState)
    }

    /// Encode a pending request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the request cannot be serialized.
    pub fn encode(&self, request: &AuthRequest) -> Result<String, AuthError> {
        let json = serde_json::to_vec(request).map_err(|_| AuthError::InvalidRequest)?;

        let Some(ref secret) = self.secret else {
            return Ok(STANDARD.encode(&json));
        };

        let mut mac = Self::mac(secret).map_err(|_| AuthError::InvalidRequest)?;
        mac.update(&json);
        let signature = mac.finalize().into_bytes();

        Ok(format!("{}.{}", URL_SAFE_NO_PAD.encode(&json), URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Decode a state blob returned by the upstream provider.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the blob is malformed, unsigned when a secret
    /// is configured, fails verification, or carries no client id.
    pub fn decode(&self, state: &str) -> Result<AuthRequest, AuthError> {
        let json = match self.secret {
            Some(ref secret) => {
                let (payload, signature) = state.split_once('.').ok_or(AuthError::InvalidState)?;
                let json = URL_SAFE_NO_PAD.decode(payload).map_err(|_| AuthError::InvalidState)?;
                let signature =
                    URL_SAFE_NO_PAD.decode(signature).map_err(|_| AuthError::InvalidState)?;

                let mut mac = Self::mac(secret)?;
                mac.update(&json);
                mac.verify_slice(&signature).map_err(|_| AuthError::InvalidState)?;
                json
            }
            None => decode_any_base64(state).ok_or(AuthError::InvalidState)?,
        };

        let request: AuthRequest =
            serde_json::from_slice(&json).map_err(|_| AuthError::InvalidState)?;

        if request.client_id.is_empty() {
            return Err(AuthError::InvalidState);
        }
        Ok(request)
    }
}

/// Accept either base64 alphabet, with or without padding.
fn decode_any_base64(value: &str) -> Option<Vec<u8>> {
    [STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(value).ok())
}

impl std::fmt::Debug for StateCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCodec").field("signed", &self.is_signed()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request(client_id: &str, state: &str) -> AuthRequest {
        AuthRequest {
            response_type: "code".into(),
            client_id: client_id.into(),
            redirect_uri: "https://client.example/cb".into(),
            scope: vec!["read".into(), "write".into()],
            state: state.into(),
            code_challenge: Some("abc".into()),
            code_challenge_method: Some("S256".into()),
        }
    }

    #[test]
    fn test_unsigned_is_standard_base64_json() {
        let codec = StateCodec::new(None);
        let encoded = codec.encode(&request("c1", "s")).unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(&encoded).unwrap()).unwrap();
        assert_eq!(json["clientId"], "c1");
        assert_eq!(json["redirectUri"], "https://client.example/cb");
    }

    #[test]
    fn test_unsigned_accepts_url_safe_alphabet() {
        let json = serde_json::to_vec(&request("c1", "??>>")).unwrap();
        let codec = StateCodec::new(None);
        assert_eq!(codec.decode(&URL_SAFE_NO_PAD.encode(&json)).unwrap().state, "??>>");
    }

    #[test]
    fn test_missing_client_id_rejected() {
        let codec = StateCodec::new(None);
        let encoded = STANDARD.encode(r#"{"responseType":"code","redirectUri":"x"}"#);
        assert_eq!(codec.decode(&encoded), Err(AuthError::InvalidState));
    }

    #[test]
    fn test_garbage_rejected() {
        let codec = StateCodec::new(None);
        assert_eq!(codec.decode("!!not base64!!"), Err(AuthError::InvalidState));
        assert_eq!(codec.decode(&STANDARD.encode("not json")), Err(AuthError::InvalidState));
    }

    #[test]
    fn test_signed_rejects_tampering() {
        let codec = StateCodec::new(Some("secret"));
        let encoded = codec.encode(&request("c1", "s")).unwrap();
        let (_, signature) = encoded.split_once('.').unwrap();

        let forged_json = serde_json::to_vec(&request("attacker", "s")).unwrap();
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode(forged_json), signature);

        assert_eq!(codec.decode(&forged), Err(AuthError::InvalidState));
    }

    #[test]
    fn test_signed_rejects_unsigned_and_other_secret() {
        let signed = StateCodec::new(Some("secret"));
        let unsigned = StateCodec::new(None).encode(&request("c1", "s")).unwrap();
        assert_eq!(signed.decode(&unsigned), Err(AuthError::InvalidState));

        let other = StateCodec::new(Some("other")).encode(&request("c1", "s")).unwrap();
        assert_eq!(signed.decode(&other), Err(AuthError::InvalidState));
    }

    #[test]
    fn test_empty_secret_means_unsigned() {
        assert!(!StateCodec::new(Some("")).is_signed());
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            client_id in "[a-zA-Z0-9_-]{1,40}",
            state in "\\PC{0,64}",
            signed in any::<bool>(),
        ) {
            let codec = StateCodec::new(signed.then_some("k3y"));
            let original = request(&client_id, &state);
            let decoded = codec.decode(&codec.encode(&original).unwrap()).unwrap();
            prop_assert_eq!(decoded, original);
        }
    }
}
