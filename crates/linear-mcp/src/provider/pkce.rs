//! PKCE (Proof Key for Code Exchange) verification.
//!
//! Implements S256 and plain code challenge verification per RFC 7636.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// Challenge methods accepted at `/auth/authorize`.
pub const SUPPORTED_METHODS: &[&str] = &["plain", "S256"];

/// Verify a PKCE S256 code challenge.
///
/// Computes `BASE64URL(SHA256(code_verifier))` and compares to the stored challenge.
pub fn verify_s256(code_verifier: &str, code_challenge: &str) -> bool {
    let hash = Sha256::digest(code_verifier.as_bytes());
    let computed = URL_SAFE_NO_PAD.encode(hash);
    computed == code_challenge
}

/// Verify a verifier against a stored challenge using `method`.
///
/// Unknown methods never verify.
pub fn verify(method: &str, code_verifier: &str, code_challenge: &str) -> bool {
    match method {
        "S256" => verify_s256(code_verifier, code_challenge),
        "plain" => code_verifier == code_challenge,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7636 Appendix B test vector
    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_s256_valid() {
        assert!(verify_s256(VERIFIER, CHALLENGE));
        assert!(verify("S256", VERIFIER, CHALLENGE));
    }

    #[test]
    fn test_s256_invalid_verifier() {
        assert!(!verify_s256("wrong-verifier", CHALLENGE));
    }

    #[test]
    fn test_plain() {
        assert!(verify("plain", "abc", "abc"));
        assert!(!verify("plain", "abc", "abd"));
    }

    #[test]
    fn test_unknown_method_fails() {
        assert!(!verify("S512", VERIFIER, CHALLENGE));
    }
}
