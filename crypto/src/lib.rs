//! Cryptographic primitives (C1) and RSA key lifecycle (C2).
//!
//! Two hash families are kept deliberately distinct: Argon2id for passwords
//! (slow, verified once per login) and scrypt for tokens (verified many
//! times per second). `constant_time` supplies the timing-safe comparisons
//! every verification path here and in the crates above it must use instead
//! of `==`.

pub mod constant_time;
pub mod error;
pub mod kdf;
pub mod random;
pub mod rsa_keys;
pub mod token_hash;

pub use error::{CryptoError, CryptoResult};
pub use kdf::{Argon2Params, Kdf, PasswordStrength};
pub use rsa_keys::{JsonWebKey, JwksResponse, KeySource, KeySourceConfig, RsaKeyManager};
