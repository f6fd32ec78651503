use thiserror::Error;

/// RFC 6749 §5.2 error codes, plus the handful the server needs for
/// boundaries the RFC doesn't name (client auth plumbing, upstream IdP
/// failures during federated login).
#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("Invalid client")]
    InvalidClient,

    #[error("Invalid grant")]
    InvalidGrant,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid scope")]
    InvalidScope,

    #[error("Unauthorized client")]
    UnauthorizedClient,

    #[error("Unsupported grant type")]
    UnsupportedGrantType,

    #[error("Access denied")]
    AccessDenied,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("External provider error: {0}")]
    ExternalProviderError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Identity error: {0}")]
    IdentityError(#[from] auth_identity::IdentityError),

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error(transparent)]
    Crypto(#[from] crypto::CryptoError),
}

impl OAuthError {
    /// The HTTP status the `/oauth/*` JSON surface maps this to (§7).
    pub fn http_status(&self) -> u16 {
        match self {
            OAuthError::InvalidClient => 401,
            OAuthError::InvalidToken => 401,
            OAuthError::AccessDenied => 403,
            OAuthError::ExternalProviderError(_)
            | OAuthError::HttpError(_)
            | OAuthError::IdentityError(_)
            | OAuthError::Store(_)
            | OAuthError::Crypto(_) => 500,
            _ => 400,
        }
    }

    /// The RFC 6749 `error` string for this failure, used verbatim on both
    /// the `/oauth/token` JSON body and the `/oauth/authorize` redirect's
    /// `error` query parameter.
    pub fn code(&self) -> &'static str {
        match self {
            OAuthError::InvalidClient => "invalid_client",
            OAuthError::InvalidGrant => "invalid_grant",
            OAuthError::InvalidRequest(_) => "invalid_request",
            OAuthError::InvalidScope => "invalid_scope",
            OAuthError::UnauthorizedClient => "unauthorized_client",
            OAuthError::UnsupportedGrantType => "unsupported_grant_type",
            OAuthError::AccessDenied => "access_denied",
            OAuthError::InvalidToken => "invalid_token",
            OAuthError::ExternalProviderError(_) => "server_error",
            OAuthError::HttpError(_) => "server_error",
            OAuthError::IdentityError(_) => "server_error",
            OAuthError::Store(_) => "server_error",
            OAuthError::Crypto(_) => "server_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, OAuthError>;
