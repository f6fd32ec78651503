//! CSPRNG-backed id and secret generation. Every value handed to a caller is
//! base64url-encoded without padding, per spec §4.1.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

fn random_token(byte_len: usize) -> String {
    URL_SAFE_NO_PAD.encode(random_bytes(byte_len))
}

/// ≥128 bits of entropy, per the Session entity's id requirement.
pub fn session_id() -> String {
    random_token(16)
}

/// ≥32 bytes, used for refresh tokens and magic-link tokens.
pub fn opaque_token() -> String {
    random_token(32)
}

/// ≥32 bytes, used for OAuth client secrets.
pub fn client_secret() -> String {
    random_token(32)
}

/// ≥32 bytes (256 bits), used for authorization codes.
pub fn authorization_code() -> String {
    random_token(32)
}

/// `client_<16-byte hex>`, per §4.7.1.
pub fn client_id() -> String {
    format!("client_{}", hex::encode(random_bytes(16)))
}

/// 6 base64url characters, used as the globally-unique, non-secret display
/// prefix of a personal API key.
pub fn api_key_prefix() -> String {
    random_token(4)[..6].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique() {
        assert_ne!(session_id(), session_id());
        assert_ne!(opaque_token(), opaque_token());
    }

    #[test]
    fn client_id_has_expected_shape() {
        let id = client_id();
        assert!(id.starts_with("client_"));
        assert_eq!(id.len(), "client_".len() + 32);
    }

    #[test]
    fn api_key_prefix_is_six_chars() {
        assert_eq!(api_key_prefix().len(), 6);
    }
}
