use serde::{Deserialize, Serialize};

/// Access-token claims (§4.4). `aud` accepts either a single string or an
/// array on the wire; OAuth access tokens always carry the server's full
/// audience list here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iss: String,
    pub aud: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// OIDC ID-token claims (§4.4). `aud` here is a single client_id, not a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub auth_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

/// A freshly minted access token plus the metadata needed to build a
/// `/oauth/token` or `/api/auth/*` response.
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_in: i64,
}

/// Result of a successful signup/login/federated-login: a new browser
/// session plus the JWT minted against it.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub session_id: String,
    pub refresh_token: String,
    pub session_expires_at: chrono::DateTime<chrono::Utc>,
    pub access_token: IssuedAccessToken,
}

/// Result of rotating a session (`/api/auth/refresh`).
#[derive(Debug, Clone)]
pub struct RotatedSession {
    pub session_id: String,
    pub refresh_token: String,
    pub session_expires_at: chrono::DateTime<chrono::Utc>,
}

/// A freshly minted personal API key. `raw_key` is shown to the caller
/// exactly once; only `record.key_hash`/`record.prefix` are persisted.
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub raw_key: String,
    pub record: store::UserApiKey,
}
