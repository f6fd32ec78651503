//! Per-request metadata attached to every tracing span: a correlation id and
//! the handful of headers worth logging. CSRF defense itself is just the
//! `SameSite=Lax` cookie attribute (§2) — this exists purely for log
//! correlation, not request rejection.

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request};
use axum::http::{header, request::Parts, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use std::convert::Infallible;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub origin: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    fn from_headers(headers: &HeaderMap) -> Self {
        let header_str = |name: axum::http::HeaderName| {
            headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
        };
        Self {
            request_id: Uuid::new_v4(),
            origin: header_str(header::ORIGIN),
            user_agent: header_str(header::USER_AGENT),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Wraps every request in a tracing span carrying its correlation id, so the
/// `TraceLayer` spans and every handler log line underneath nest under one
/// `request_id` a login or token exchange can be traced by end to end.
pub async fn attach(req: Request, next: Next) -> Response {
    let ctx = RequestContext::from_headers(req.headers());
    let span = tracing::info_span!(
        "request",
        request_id = %ctx.request_id,
        origin = ctx.origin.as_deref().unwrap_or("-"),
    );
    async move {
        tracing::debug!(user_agent = ctx.user_agent.as_deref().unwrap_or("-"), "request started");
        next.run(req).await
    }
    .instrument(span)
    .await
}
