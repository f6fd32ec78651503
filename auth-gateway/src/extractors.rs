use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

use crate::authenticator::Authenticator;
use crate::error::GatewayError;
use crate::principal::Principal;

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn session_cookie(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get("session_id")
        .map(|cookie| cookie.value().to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    Arc<Authenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = Arc::<Authenticator>::from_ref(state);
        let bearer = bearer_token(parts);
        let session_id = session_cookie(parts);
        authenticator
            .authenticate(bearer.as_deref(), session_id.as_deref())
            .await
    }
}

/// Same precedence order as `Principal`, but never rejects: a missing or
/// unverifiable credential resolves to `Principal::None` instead of a 401.
pub struct OptionalPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalPrincipal
where
    Arc<Authenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = Arc::<Authenticator>::from_ref(state);
        let bearer = bearer_token(parts);
        let session_id = session_cookie(parts);
        let principal = authenticator
            .authenticate_optional(bearer.as_deref(), session_id.as_deref())
            .await;
        Ok(OptionalPrincipal(principal))
    }
}

/// Requires an authenticated principal whose `User.is_admin` flag is set;
/// 403s everyone else (§4.5's admin wrapper).
pub struct AuthenticatedAdmin(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedAdmin
where
    Arc<Authenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = Arc::<Authenticator>::from_ref(state);
        let principal = Principal::from_request_parts(parts, state).await?;
        authenticator.require_admin(&principal).await?;
        Ok(AuthenticatedAdmin(principal))
    }
}

/// The UserInfo endpoint (§4.7.4) accepts only JWT access tokens, never an
/// API key or session cookie.
pub struct JwtPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for JwtPrincipal
where
    Arc<Authenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = Arc::<Authenticator>::from_ref(state);
        let bearer = bearer_token(parts).ok_or(GatewayError::Unauthorized)?;
        let principal = authenticator.authenticate_jwt_only(&bearer).await?;
        Ok(JwtPrincipal(principal))
    }
}
