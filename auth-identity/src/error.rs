use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email already registered")]
    EmailAlreadyInUse,

    #[error("password does not meet strength requirements")]
    WeakPassword,

    #[error("user not found")]
    UserNotFound,

    #[error("session not found or expired")]
    SessionInvalid,

    #[error("token expired")]
    TokenExpired,

    #[error("token invalid")]
    InvalidToken,

    #[error("active API key limit reached")]
    ApiKeyLimitReached,

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error(transparent)]
    Crypto(#[from] crypto::CryptoError),

    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

pub type Result<T> = std::result::Result<T, IdentityError>;
