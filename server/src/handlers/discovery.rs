//! `/.well-known/*` documents (§4.7.5). These must be anonymously reachable
//! under every condition (property P9) — no extractor here can reject, and
//! the router never places an auth layer in front of this module.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::state::AppState;

const CACHE_CONTROL: &str = "public, max-age=3600";

pub async fn jwks(State(state): State<AppState>) -> Response {
    let body = Json(state.oauth.discovery.jwks());
    (
        [(header::CACHE_CONTROL, CACHE_CONTROL)],
        body,
    )
        .into_response()
}

pub async fn oauth_authorization_server(State(state): State<AppState>) -> Response {
    let body = Json(state.oauth.discovery.oauth_authorization_server());
    ([(header::CACHE_CONTROL, CACHE_CONTROL)], body).into_response()
}

pub async fn openid_configuration(State(state): State<AppState>) -> Response {
    let body = Json(state.oauth.discovery.openid_configuration());
    ([(header::CACHE_CONTROL, CACHE_CONTROL)], body).into_response()
}

pub async fn oauth_protected_resource(State(state): State<AppState>) -> Response {
    let body = Json(state.oauth.discovery.oauth_protected_resource());
    ([(header::CACHE_CONTROL, CACHE_CONTROL)], body).into_response()
}
