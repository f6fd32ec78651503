//! Password, federated, and magic-link flows of §4.8, mounted under
//! `/api/auth/*`. Unlike `handlers::oauth`, every response here uses the
//! `/api/*` `{success, ...}` envelope and `ApiError`.

use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use config_engine::Environment;
use store::MagicLinkTokenType;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::middleware::RouteClass;
use crate::state::AppState;
use crate::validation::RequestValidation;
use crate::{validate_email, validate_field, validate_required};

const SESSION_COOKIE: &str = "session_id";
const REFRESH_COOKIE: &str = "refresh_token";
const OAUTH_STATE_COOKIE: &str = "federated_oauth_state";

fn session_cookie(state: &AppState, value: String, expires_at: chrono::DateTime<Utc>) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.environment == Environment::Production)
        .expires(cookie::Expiration::from(cookie_time(expires_at)))
        .build()
}

fn refresh_cookie(state: &AppState, value: String, expires_at: chrono::DateTime<Utc>) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, value))
        .path("/api/auth")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.environment == Environment::Production)
        .expires(cookie::Expiration::from(cookie_time(expires_at)))
        .build()
}

fn cookie_time(at: chrono::DateTime<Utc>) -> cookie::time::OffsetDateTime {
    cookie::time::OffsetDateTime::from_unix_timestamp(at.timestamp()).unwrap_or(cookie::time::OffsetDateTime::UNIX_EPOCH)
}

fn removal_cookie(name: &'static str, path: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path(path)
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::ZERO)
        .build()
}

fn client_key(addr: Option<ConnectInfo<SocketAddr>>) -> String {
    addr.map(|ConnectInfo(a)| a.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug, Serialize)]
struct SessionView {
    user: UserView,
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Serialize)]
struct UserView {
    id: String,
    email: String,
    email_verified: bool,
}

impl From<&store::User> for UserView {
    fn from(user: &store::User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            email_verified: user.email_verified,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

impl RequestValidation for SignupRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.email, "Email is required");
        validate_email!(self.email, "Invalid email format");
        validate_required!(self.password, "Password is required");
        Ok(())
    }
}

pub async fn signup(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
    headers: axum::http::HeaderMap,
    Json(req): Json<SignupRequest>,
) -> Result<(CookieJar, Json<ApiResponse<SessionView>>), ApiError> {
    state.rate_limiter.check(RouteClass::Auth, &client_key(addr))?;
    req.validate()?;

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let client_ip = addr.map(|ConnectInfo(a)| a.ip().to_string());

    let (user, session) = state
        .auth_flows
        .signup(&req.email, &req.password, client_ip, user_agent)
        .await?;

    let jar = jar
        .add(session_cookie(&state, session.session_id, session.session_expires_at))
        .add(refresh_cookie(&state, session.refresh_token, session.session_expires_at));

    Ok((
        jar,
        Json(api_success(SessionView {
            user: UserView::from(&user),
            access_token: session.access_token.token,
            expires_in: session.access_token.expires_in,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl RequestValidation for LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.email, "Email is required");
        validate_required!(self.password, "Password is required");
        Ok(())
    }
}

pub async fn login(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
    headers: axum::http::HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<SessionView>>), ApiError> {
    state.rate_limiter.check(RouteClass::Auth, &client_key(addr))?;
    req.validate()?;

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let client_ip = addr.map(|ConnectInfo(a)| a.ip().to_string());

    let (user, session) = state
        .auth_flows
        .login(&req.email, &req.password, client_ip, user_agent)
        .await?;

    let jar = jar
        .add(session_cookie(&state, session.session_id, session.session_expires_at))
        .add(refresh_cookie(&state, session.refresh_token, session.session_expires_at));

    Ok((
        jar,
        Json(api_success(SessionView {
            user: UserView::from(&user),
            access_token: session.access_token.token,
            expires_in: session.access_token.expires_in,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct TokenOnlyRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct TokenOnlyView {
    access_token: String,
    expires_in: i64,
}

pub async fn token(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<TokenOnlyRequest>,
) -> Result<Json<ApiResponse<TokenOnlyView>>, ApiError> {
    state.rate_limiter.check(RouteClass::Auth, &client_key(addr))?;

    let issued = state.auth_flows.token_only(&req.email, &req.password).await?;
    Ok(Json(api_success(TokenOnlyView {
        access_token: issued.token,
        expires_in: issued.expires_in,
    })))
}

pub async fn refresh(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<TokenOnlyView>>), ApiError> {
    state.rate_limiter.check(RouteClass::Auth, &client_key(addr))?;

    let session_id = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(ApiError::Unauthorized)?;
    let refresh_token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(ApiError::Unauthorized)?;

    let (_user, rotated, access_token) = state.auth_flows.refresh(&session_id, &refresh_token).await?;

    let jar = jar
        .add(session_cookie(&state, rotated.session_id, rotated.session_expires_at))
        .add(refresh_cookie(&state, rotated.refresh_token, rotated.session_expires_at));

    Ok((
        jar,
        Json(api_success(TokenOnlyView {
            access_token: access_token.token,
            expires_in: access_token.expires_in,
        })),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    if let Some(session_id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        state.auth_flows.logout(&session_id).await?;
    }

    let jar = jar
        .add(removal_cookie(SESSION_COOKIE, "/"))
        .add(removal_cookie(REFRESH_COOKIE, "/api/auth"));

    Ok((jar, StatusCode::NO_CONTENT))
}

fn federated_client(
    state: &AppState,
    provider: &str,
) -> Result<std::sync::Arc<auth_oauth::FederatedClient>, ApiError> {
    match provider {
        "google" => state
            .google
            .clone()
            .ok_or_else(|| ApiError::Validation("google login is not configured".to_string())),
        "github" => state
            .github
            .clone()
            .ok_or_else(|| ApiError::Validation("github login is not configured".to_string())),
        other => Err(ApiError::Validation(format!("unknown provider {other}"))),
    }
}

pub async fn federated_redirect(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let client = federated_client(&state, &provider)?;
    let (url, csrf) = client.authorization_url().map_err(ApiError::from)?;

    let jar = jar.add(
        Cookie::build((OAUTH_STATE_COOKIE, csrf.secret().clone()))
            .path("/api/auth")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(state.config.environment == Environment::Production)
            .build(),
    );

    Ok((jar, Redirect::to(&url)))
}

#[derive(Debug, Deserialize)]
pub struct FederatedCallbackQuery {
    pub code: String,
    pub state: String,
}

pub async fn federated_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    addr: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
    headers: axum::http::HeaderMap,
    axum::extract::Query(query): axum::extract::Query<FederatedCallbackQuery>,
) -> Result<(CookieJar, Json<ApiResponse<SessionView>>), ApiError> {
    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(ApiError::Unauthorized)?;
    if !crypto::constant_time::ct_eq_str(&expected_state, &query.state) {
        return Err(ApiError::Unauthorized);
    }

    let client = federated_client(&state, &provider)?;
    let profile = client
        .exchange_and_fetch_profile(&query.code)
        .await
        .map_err(ApiError::from)?;

    let user = state
        .accounts
        .find_or_create_federated_user(&provider, &profile.provider_account_id, &profile.email, profile.email_verified)
        .await?;

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let client_ip = addr.map(|ConnectInfo(a)| a.ip().to_string());

    let new_session = state.sessions.create(user.id, client_ip, user_agent).await?;
    let access_token = state
        .tokens
        .issue_access_token(&user.id.to_string(), Some(&user.email), None, None)?;

    let jar = jar
        .remove(Cookie::new(OAUTH_STATE_COOKIE, ""))
        .add(session_cookie(&state, new_session.session_id, new_session.expires_at))
        .add(refresh_cookie(&state, new_session.refresh_token, new_session.expires_at));

    Ok((
        jar,
        Json(api_success(SessionView {
            user: UserView::from(&user),
            access_token: access_token.token,
            expires_in: access_token.expires_in,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct RequestEmailVerificationRequest {
    pub email: String,
}

/// Always 200 regardless of whether the email is known (§4.8 enumeration
/// safety) — the link is embedded `<user_id>.<raw_token>` since the store
/// has no global lookup by token hash, only `(user_id, token_type)`.
pub async fn request_email_verification(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<RequestEmailVerificationRequest>,
) -> Result<StatusCode, ApiError> {
    state.rate_limiter.check(RouteClass::MagicLink, &client_key(addr))?;

    let email = auth_identity::AccountService::normalize_email(&req.email);
    if let Some((user_id, raw_token)) = state
        .accounts
        .request_magic_link(&email, MagicLinkTokenType::EmailVerification)
        .await?
    {
        let verify_url = format!(
            "{}/api/auth/verify-email/{}.{}",
            state.config.cors_origin, user_id, raw_token
        );
        if let Err(e) = state.mailer.send_verification(&email, &verify_url).await {
            tracing::warn!(error = %e, "failed to send verification email");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<StatusCode, ApiError> {
    let (user_id, raw_token) = split_embedded_token(&token)?;
    state.accounts.verify_email(user_id, raw_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct RequestPasswordResetRequest {
    pub email: String,
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<RequestPasswordResetRequest>,
) -> Result<StatusCode, ApiError> {
    state.rate_limiter.check(RouteClass::MagicLink, &client_key(addr))?;

    let email = auth_identity::AccountService::normalize_email(&req.email);
    if let Some((user_id, raw_token)) = state
        .accounts
        .request_magic_link(&email, MagicLinkTokenType::PasswordReset)
        .await?
    {
        let reset_url = format!(
            "{}/reset-password?token={}.{}",
            state.config.cors_origin, user_id, raw_token
        );
        if let Err(e) = state.mailer.send_password_reset(&email, &reset_url).await {
            tracing::warn!(error = %e, "failed to send password-reset email");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct VerifyPasswordResetRequest {
    pub token: String,
    pub new_password: String,
}

impl RequestValidation for VerifyPasswordResetRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.token, "Token is required");
        validate_required!(self.new_password, "New password is required");
        Ok(())
    }
}

pub async fn verify_password_reset(
    State(state): State<AppState>,
    Json(req): Json<VerifyPasswordResetRequest>,
) -> Result<StatusCode, ApiError> {
    req.validate()?;
    let (user_id, raw_token) = split_embedded_token(&req.token)?;
    state
        .accounts
        .reset_password(user_id, raw_token, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Splits the `<user_id>.<raw_token>` wire format used by bare-URL
/// magic-link tokens (verify-email's `GET .../:token` and the
/// password-reset link embedded in the reset email).
fn split_embedded_token(value: &str) -> Result<(uuid::Uuid, &str), ApiError> {
    let (id, token) = value
        .split_once('.')
        .ok_or(ApiError::Unauthorized)?;
    let user_id = uuid::Uuid::parse_str(id).map_err(|_| ApiError::Unauthorized)?;
    Ok((user_id, token))
}

