//! The OAuth 2.1 / OIDC protocol surface (§4.7): registration, the
//! authorize state machine, token exchange, and userinfo. Every handler here
//! returns [`OAuthErrorResponse`] on failure — raw RFC 6749 JSON, never the
//! `/api/*` envelope.

use axum::extract::{Form, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use auth_gateway::{OptionalPrincipal, Principal};
use auth_oauth::models::{AuthorizeParams, RegisterClientRequest, TokenRequest};
use auth_oauth::{AuthenticatedUser, AuthorizeOutcome, OAuthError};

use crate::error::OAuthErrorResponse;
use crate::state::AppState;

/// `decide()` only needs a user id and an auth time; session/Bearer
/// principals both carry a user id, so either authenticates the endpoint.
/// `auth_time` isn't read by code issuance today (it's carried into the ID
/// token only at token-exchange time, from the authorization code's own
/// `created_at`), so `Utc::now()` here is a harmless placeholder.
fn authenticated_user(principal: &Principal) -> Option<AuthenticatedUser> {
    principal.user_id().map(|user_id| AuthenticatedUser {
        user_id,
        auth_time: Utc::now(),
    })
}

fn encode_authorize_params(params: &AuthorizeParams) -> String {
    let mut ser = url::form_urlencoded::Serializer::new(String::new());
    ser.append_pair("response_type", &params.response_type);
    ser.append_pair("client_id", &params.client_id);
    ser.append_pair("redirect_uri", &params.redirect_uri);
    ser.append_pair("scope", &params.scope);
    if let Some(state) = &params.state {
        ser.append_pair("state", state);
    }
    if let Some(challenge) = &params.code_challenge {
        ser.append_pair("code_challenge", challenge);
    }
    if let Some(method) = &params.code_challenge_method {
        ser.append_pair("code_challenge_method", method);
    }
    ser.finish()
}

fn percent_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// `axum::response::Redirect::to` issues a 303 See Other, which would turn
/// a GET `/oauth/authorize` retry into a same-method redirect fine but
/// reads oddly against RFC 6749 examples that all show 302. Built by hand
/// to keep the conventional status code.
fn found(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location)],
    )
        .into_response()
}

async fn decide_and_respond(
    state: &AppState,
    params: AuthorizeParams,
    principal: Principal,
) -> Result<Response, OAuthErrorResponse> {
    let authenticated = authenticated_user(&principal);
    let outcome = state
        .oauth
        .authorize
        .decide(&params, authenticated.as_ref())
        .await?;

    let response = match outcome {
        AuthorizeOutcome::NeedsLogin => {
            let original = format!("/oauth/authorize?{}", encode_authorize_params(&params));
            let target = format!(
                "{}/login?redirect={}",
                state.config.cors_origin,
                percent_encode(&original)
            );
            found(&target)
        }
        AuthorizeOutcome::NeedsConsent { .. } => {
            let target = format!(
                "{}/consent?{}",
                state.config.cors_origin,
                encode_authorize_params(&params)
            );
            found(&target)
        }
        AuthorizeOutcome::Issued { redirect_uri, code, state: query_state } => {
            let mut ser = url::form_urlencoded::Serializer::new(String::new());
            ser.append_pair("code", &code);
            if let Some(s) = &query_state {
                ser.append_pair("state", s);
            }
            found(&format!("{redirect_uri}?{}", ser.finish()))
        }
        AuthorizeOutcome::Redirected { redirect_uri, error, state: query_state } => {
            let mut ser = url::form_urlencoded::Serializer::new(String::new());
            ser.append_pair("error", error);
            if let Some(s) = &query_state {
                ser.append_pair("state", s);
            }
            found(&format!("{redirect_uri}?{}", ser.finish()))
        }
    };
    Ok(response)
}

pub async fn authorize_get(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    Query(params): Query<AuthorizeParams>,
) -> Result<Response, OAuthErrorResponse> {
    decide_and_respond(&state, params, principal).await
}

pub async fn authorize_post(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    Form(params): Form<AuthorizeParams>,
) -> Result<Response, OAuthErrorResponse> {
    decide_and_respond(&state, params, principal).await
}

pub async fn token(
    State(state): State<AppState>,
    Form(req): Form<TokenRequest>,
) -> Result<Response, OAuthErrorResponse> {
    let response = state.oauth.token.exchange(req).await?;
    Ok(([(header::CACHE_CONTROL, "no-store")], Json(response)).into_response())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterClientRequest>,
) -> Result<Response, OAuthErrorResponse> {
    let response = state.oauth.registrar.register(req).await?;
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

pub async fn userinfo(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, OAuthErrorResponse> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(OAuthError::InvalidToken)?;

    let claims = state
        .tokens
        .verify_access_token(bearer)
        .map_err(OAuthError::from)?;
    let info = state.oauth.userinfo.userinfo(&claims).await?;

    Ok(([(header::CACHE_CONTROL, "no-store")], Json(info)).into_response())
}
