use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("invalid key")]
    InvalidKey,

    #[error("invalid data format")]
    InvalidFormat,

    #[error("invalid UTF-8 in decoded data")]
    InvalidUtf8,

    #[error("hash computation failed: {0}")]
    HashFailed(String),

    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
