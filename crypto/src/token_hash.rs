//! Token hashing (session refresh tokens, magic-link tokens, API keys,
//! client secrets) — scrypt rather than Argon2id, since these are verified
//! far more often per second than a login password and need a cheaper cost
//! profile while still resisting offline brute force of the stored hash.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use scrypt::{scrypt, Params};
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 64;

fn scrypt_params() -> Params {
    // log2(N)=15 (N=32768), r=8, p=1 — scrypt's own interactive-use defaults.
    Params::new(15, 8, 1, HASH_LEN).expect("static scrypt params are valid")
}

/// Hashes `token` into the stored form `base64url(salt) "$" base64url(hash)`.
pub fn hash_token(token: &str) -> Result<String, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut salt);

    let mut derived = [0u8; HASH_LEN];
    scrypt(token.as_bytes(), &salt, &scrypt_params(), &mut derived)
        .map_err(|e| CryptoError::HashFailed(e.to_string()))?;

    Ok(format!(
        "{}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(derived)
    ))
}

/// Verifies `token` against a stored hash produced by [`hash_token`], using a
/// timing-safe comparison of the derived bytes.
pub fn verify_token(token: &str, stored: &str) -> Result<bool, CryptoError> {
    let (salt_b64, hash_b64) = stored.split_once('$').ok_or(CryptoError::InvalidFormat)?;

    let salt = URL_SAFE_NO_PAD
        .decode(salt_b64)
        .map_err(|_| CryptoError::InvalidFormat)?;
    let expected = URL_SAFE_NO_PAD
        .decode(hash_b64)
        .map_err(|_| CryptoError::InvalidFormat)?;

    let mut derived = vec![0u8; expected.len()];
    scrypt(token.as_bytes(), &salt, &scrypt_params(), &mut derived)
        .map_err(|e| CryptoError::HashFailed(e.to_string()))?;

    Ok(derived.ct_eq(&expected).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let hash = hash_token("a-very-long-refresh-token-value").unwrap();
        assert!(verify_token("a-very-long-refresh-token-value", &hash).unwrap());
        assert!(!verify_token("wrong-token", &hash).unwrap());
    }

    #[test]
    fn distinct_hashes_for_same_token() {
        let a = hash_token("same-token").unwrap();
        let b = hash_token("same-token").unwrap();
        assert_ne!(a, b);
        assert!(verify_token("same-token", &a).unwrap());
        assert!(verify_token("same-token", &b).unwrap());
    }

    #[test]
    fn rejects_malformed_stored_hash() {
        assert!(verify_token("token", "not-a-valid-stored-hash").is_err());
    }
}
