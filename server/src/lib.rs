//! Koauth HTTP server — OAuth 2.1 / OIDC authorization server and identity
//! provider. This crate is the thinnest layer in the workspace: it owns
//! configuration loading, application state, HTTP routing, and the
//! error/validation/rate-limit boundary; every protocol and account
//! operation itself lives in `auth-oauth`, `auth-identity`, and
//! `auth-gateway`.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod validation;

pub use error::{ApiError, ApiResponse};
pub use state::AppState;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use middleware::request_context;

/// Wires the route tree onto `state`, layering tracing and CORS the way
/// every handler in this crate assumes: `/.well-known/*` is reachable from
/// anywhere with no credentials (property P9, applied independently inside
/// `routes::create_routes`), the rest is scoped to `state.config.cors_origin`.
pub fn create_app(state: AppState) -> Router {
    let api_cors = if state.config.cors_origin == "*" {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origin: axum::http::HeaderValue = state
            .config
            .cors_origin
            .parse()
            .unwrap_or_else(|_| axum::http::HeaderValue::from_static("*"));
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    routes::create_routes(api_cors)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_context::attach)),
        )
        .with_state(state)
}
