//! PKCE (Proof Key for Code Exchange) and state generation
//!
//! Implements RFC 7636 S256 challenges. All randomness comes from the
//! operating system CSPRNG; nothing here persists anything, callers keep the
//! verifier and state until the callback arrives.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use ssokit_domain::constants::{CODE_VERIFIER_BYTES, STATE_BYTES};
use ssokit_domain::PkcePair;

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a cryptographically secure code verifier
///
/// 32 random bytes (256 bits) → 43 base64url characters, within the RFC 7636
/// 43-128 character limit.
#[must_use]
pub fn generate_code_verifier() -> String {
    random_token(CODE_VERIFIER_BYTES)
}

/// Compute the S256 code challenge for a verifier
///
/// `challenge = BASE64URL(SHA256(ASCII(code_verifier)))`
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Generate a fresh verifier/challenge pair for one login attempt.
#[must_use]
pub fn generate_pkce() -> PkcePair {
    let code_verifier = generate_code_verifier();
    let code_challenge = generate_code_challenge(&code_verifier);
    PkcePair { code_verifier, code_challenge }
}

/// Generate a random state nonce for CSRF protection
///
/// 16 random bytes (128 bits) → 22 base64url characters.
#[must_use]
pub fn generate_state() -> String {
    random_token(STATE_BYTES)
}

/// Check that a verifier hashes to the given challenge.
#[must_use]
pub fn verify_challenge(verifier: &str, challenge: &str) -> bool {
    constant_time_eq(generate_code_challenge(verifier).as_bytes(), challenge.as_bytes())
}

/// Exact-equality check of a returned state against the issued one.
///
/// Comparison time does not depend on where the inputs first differ.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    constant_time_eq(expected.as_bytes(), actual.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    //! Unit tests for pkce.
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn challenge_is_sha256_of_verifier() {
        for _ in 0..32 {
            let pair = generate_pkce();
            let expected = URL_SAFE_NO_PAD.encode(Sha256::digest(pair.code_verifier.as_bytes()));
            assert_eq!(pair.code_challenge, expected);
            assert!(verify_challenge(&pair.code_verifier, &pair.code_challenge));
        }
    }

    #[test]
    fn rfc7636_appendix_b_vector() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(generate_code_challenge(verifier), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn verifier_length_and_alphabet() {
        let verifier = generate_code_verifier();
        assert_eq!(verifier.len(), 43);
        assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn state_is_at_least_128_bits() {
        let state = generate_state();
        assert_eq!(state.len(), 22);
        assert!(!state.contains('='));
    }

    #[test]
    fn state_nonces_do_not_collide() {
        let draws: HashSet<String> = (0..10_000).map(|_| generate_state()).collect();
        assert_eq!(draws.len(), 10_000);
    }

    #[test]
    fn state_validation_is_exact() {
        let state = generate_state();
        assert!(validate_state(&state, &state));
        assert!(!validate_state(&state, &generate_state()));
        assert!(!validate_state(&state, &state[..state.len() - 1]));
        assert!(!validate_state(&state, ""));
    }

    #[test]
    fn mismatched_challenge_is_rejected() {
        let pair = generate_pkce();
        assert!(!verify_challenge("some-other-verifier", &pair.code_challenge));
    }
}
