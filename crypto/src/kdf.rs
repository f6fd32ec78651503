use crate::error::CryptoError;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use rand::RngCore;

pub type KdfResult<T> = Result<T, CryptoError>;

/// Argon2id parameters for password hashing (spec §4.1: memoryCost ≈ 19 MiB,
/// timeCost = 2, parallelism = 1).
#[derive(Debug, Clone)]
pub struct Argon2Params {
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_cost: 19_456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

/// Password hashing/verification via Argon2id.
pub struct Kdf;

impl Kdf {
    /// Hashes a password, returning a PHC-format string that embeds the
    /// algorithm, parameters, and salt alongside the hash.
    pub fn argon2_hash(password: &[u8], params: &Argon2Params) -> KdfResult<String> {
        let salt = SaltString::generate(&mut rand::thread_rng());

        let argon2 = Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            argon2::Params::new(params.memory_cost, params.time_cost, params.parallelism, None)
                .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?,
        );

        Ok(argon2
            .hash_password(password, &salt)
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?
            .to_string())
    }

    /// Verifies a password against a PHC-format Argon2 hash. Accepts any
    /// valid encoded hash regardless of the parameters it was created with.
    pub fn argon2_verify(password: &[u8], password_hash: &str) -> KdfResult<bool> {
        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
        Ok(Argon2::default().verify_password(password, &parsed_hash).is_ok())
    }

    /// True when `password_hash` was produced with parameters weaker than
    /// `target` — callers should transparently rehash on next successful
    /// login when this returns true.
    pub fn argon2_needs_rehash(password_hash: &str, target: &Argon2Params) -> bool {
        let Ok(parsed) = PasswordHash::new(password_hash) else {
            return true;
        };
        let Some(m_cost) = parsed.params.get_decimal("m") else {
            return true;
        };
        let Some(t_cost) = parsed.params.get_decimal("t") else {
            return true;
        };
        m_cost < target.memory_cost as u64 || t_cost < target.time_cost as u64
    }

    /// Generates `length` cryptographically random bytes.
    pub fn generate_salt(length: usize) -> Vec<u8> {
        let mut salt = vec![0u8; length];
        rand::thread_rng().fill_bytes(&mut salt);
        salt
    }
}

/// Minimum-bar password strength check used at signup and password-change
/// time; independent from the hashing cost parameters above.
pub struct PasswordStrength;

impl PasswordStrength {
    pub fn is_strong(password: &str) -> bool {
        password.len() >= 8
            && password.chars().any(|c| c.is_uppercase())
            && password.chars().any(|c| c.is_lowercase())
            && password.chars().any(|c| c.is_numeric())
            && password.chars().any(|c| !c.is_alphanumeric())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argon2_hash_verify_round_trip() {
        let password = b"secure_password_123!";
        let hash = Kdf::argon2_hash(password, &Argon2Params::default()).unwrap();

        assert!(Kdf::argon2_verify(password, &hash).unwrap());
        assert!(!Kdf::argon2_verify(b"wrong_password", &hash).unwrap());
        assert_ne!(hash, String::from_utf8_lossy(password));
    }

    #[test]
    fn argon2_hash_is_salted() {
        let password = b"same_password";
        let hash1 = Kdf::argon2_hash(password, &Argon2Params::default()).unwrap();
        let hash2 = Kdf::argon2_hash(password, &Argon2Params::default()).unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn needs_rehash_detects_weaker_params() {
        let weak = Argon2Params {
            memory_cost: 8192,
            time_cost: 1,
            parallelism: 1,
        };
        let hash = Kdf::argon2_hash(b"password", &weak).unwrap();
        assert!(Kdf::argon2_needs_rehash(&hash, &Argon2Params::default()));
    }

    #[test]
    fn password_strength_checker() {
        assert!(!PasswordStrength::is_strong("weak"));
        assert!(!PasswordStrength::is_strong("nouppercase1!"));
        assert!(!PasswordStrength::is_strong("NOLOWERCASE1!"));
        assert!(!PasswordStrength::is_strong("NoSpecialChar1"));
        assert!(PasswordStrength::is_strong("StrongPass1!"));
    }

    #[test]
    fn generate_salt_is_unique() {
        let a = Kdf::generate_salt(16);
        let b = Kdf::generate_salt(16);
        assert_ne!(a, b);
        assert_eq!(a.len(), 16);
    }
}
