//! HTTP error boundary (§7). Domain crates only ever return their own
//! `thiserror` enum; this module is the single place that turns one into a
//! status code and a JSON body, separately for the `/api/*` and `/oauth/*`
//! surfaces. No handler builds a `StatusCode` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use auth_gateway::GatewayError;
use auth_identity::IdentityError;
use auth_oauth::OAuthError;
use error_common::ErrorCode;
use store::StoreError;

/// The `/api/*` error taxonomy of §7. `Unauthorized` carries no message on
/// purpose — every cause renders the same generic text so the response never
/// becomes an oracle for which verification step failed.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Unauthorized,
    Forbidden,
    Conflict(String),
    RateLimit(String),
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// Maps onto `error-common`'s shared taxonomy rather than inventing a
    /// parallel code space — the wire `code` field is this `ErrorCode`'s
    /// `category-code` form (e.g. `VALIDATION-1001`).
    fn code(&self) -> ErrorCode {
        match self {
            ApiError::Validation(_) => ErrorCode::INVALID_INPUT,
            ApiError::Unauthorized => ErrorCode::SESSION_INVALID,
            ApiError::Forbidden => ErrorCode::ACCESS_DENIED,
            ApiError::Conflict(_) => ErrorCode::CONFLICT,
            ApiError::RateLimit(_) => ErrorCode::RATE_LIMITED,
            ApiError::Internal(_) => ErrorCode::INTERNAL_ERROR,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Rate limiting gets its own wire shape per §7, not {success,error,code}.
        if let ApiError::RateLimit(message) = &self {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "statusCode": 429,
                    "error": "Too Many Requests",
                    "message": message,
                })),
            )
                .into_response();
        }

        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal server error");
                "An internal error occurred".to_string()
            }
            ApiError::Unauthorized => "Invalid or expired credentials".to_string(),
            other => other.to_string(),
        };

        (
            self.status(),
            Json(json!({
                "success": false,
                "error": message,
                "code": self.code().to_string(),
            })),
        )
            .into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Validation(m) | ApiError::Conflict(m) | ApiError::RateLimit(m) | ApiError::Internal(m) => {
                write!(f, "{m}")
            }
            ApiError::Unauthorized => write!(f, "unauthorized"),
            ApiError::Forbidden => write!(f, "forbidden"),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => ApiError::Unauthorized,
            IdentityError::EmailAlreadyInUse => {
                ApiError::Conflict("email already registered".to_string())
            }
            IdentityError::WeakPassword => {
                ApiError::Validation("password does not meet strength requirements".to_string())
            }
            IdentityError::UserNotFound
            | IdentityError::SessionInvalid
            | IdentityError::TokenExpired
            | IdentityError::InvalidToken => ApiError::Unauthorized,
            IdentityError::ApiKeyLimitReached => {
                ApiError::Validation("active API key limit reached".to_string())
            }
            IdentityError::Store(e) => {
                tracing::error!(error = %e, "store error");
                ApiError::Internal(e.to_string())
            }
            IdentityError::Crypto(e) => {
                tracing::error!(error = %e, "crypto error");
                ApiError::Internal(e.to_string())
            }
            IdentityError::Jwt(e) => {
                tracing::error!(error = %e, "jwt error");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unauthorized => ApiError::Unauthorized,
            GatewayError::Forbidden => ApiError::Forbidden,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "store error");
        ApiError::Internal(err.to_string())
    }
}

/// Used only at boundaries where an OAuth-engine error surfaces through an
/// `/api/*` route (federated login runs through `auth-oauth::FederatedClient`
/// but is mounted under `/api/auth/*`, not `/oauth/*`).
impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::IdentityError(e) => e.into(),
            OAuthError::Store(_) | OAuthError::Crypto(_) | OAuthError::HttpError(_) => {
                tracing::error!(error = %err, "oauth engine error");
                ApiError::Internal(err.to_string())
            }
            other => ApiError::Validation(other.to_string()),
        }
    }
}

/// Wraps an `OAuthError` for the `/oauth/*` surface, which returns raw RFC
/// 6749 `{error, error_description}` JSON instead of the `/api/*` envelope.
pub struct OAuthErrorResponse(pub OAuthError);

impl From<OAuthError> for OAuthErrorResponse {
    fn from(err: OAuthError) -> Self {
        OAuthErrorResponse(err)
    }
}

impl IntoResponse for OAuthErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if matches!(
            self.0,
            OAuthError::Store(_)
                | OAuthError::Crypto(_)
                | OAuthError::HttpError(_)
                | OAuthError::IdentityError(_)
                | OAuthError::ExternalProviderError(_)
        ) {
            tracing::error!(error = %self.0, "oauth protocol error");
        }
        (
            status,
            Json(json!({
                "error": self.0.code(),
                "error_description": self.0.to_string(),
            })),
        )
            .into_response()
    }
}

/// The `{success: true, ...}` envelope every `/api/*` success response uses
/// (§6 Wire formats). `T`'s own fields are flattened alongside `success`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

pub fn api_success<T: Serialize>(data: T) -> ApiResponse<T> {
    ApiResponse { success: true, data }
}
