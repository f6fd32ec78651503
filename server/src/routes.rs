//! The HTTP surface table of §6: every `/api/*`, `/oauth/*`, and
//! `/.well-known/*` route, grouped by surface and merged in [`create_routes`].

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{auth, discovery, health, me, oauth};
use crate::state::AppState;

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health_check))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/token", post(auth::token))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/:provider", get(auth::federated_redirect))
        .route("/api/auth/:provider/callback", get(auth::federated_callback))
        .route(
            "/api/auth/verify-email/request",
            post(auth::request_email_verification),
        )
        .route("/api/auth/verify-email/:token", get(auth::verify_email))
        .route(
            "/api/auth/reset-password/request",
            post(auth::request_password_reset),
        )
        .route(
            "/api/auth/reset-password/verify",
            post(auth::verify_password_reset),
        )
}

fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(me::me))
        .route(
            "/api/me/api-keys",
            get(me::list_api_keys).post(me::create_api_key),
        )
        .route("/api/me/api-keys/:id", delete(me::delete_api_key))
}

fn oauth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/oauth/authorize",
            get(oauth::authorize_get).post(oauth::authorize_post),
        )
        .route("/oauth/token", post(oauth::token))
        .route("/oauth/register", post(oauth::register))
        .route("/oauth/userinfo", get(oauth::userinfo))
}

/// §4.7.5: discovery documents are reachable "regardless" of the rest of the
/// API's CORS policy — wildcard origin, no credentials, unconditionally. This
/// layer is applied here, before the merge in [`create_routes`], so the
/// restrictive API-wide CORS layer never wraps these routes.
fn discovery_routes() -> Router<AppState> {
    Router::new()
        .route("/.well-known/jwks.json", get(discovery::jwks))
        .route(
            "/.well-known/oauth-authorization-server",
            get(discovery::oauth_authorization_server),
        )
        .route(
            "/.well-known/openid-configuration",
            get(discovery::openid_configuration),
        )
        .route(
            "/.well-known/oauth-protected-resource",
            get(discovery::oauth_protected_resource),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// `api_cors` is scoped to every route here except discovery, which carries
/// its own unconditional wildcard CORS layer applied before this merge.
pub fn create_routes(api_cors: CorsLayer) -> Router<AppState> {
    let api = Router::new()
        .merge(health_routes())
        .merge(auth_routes())
        .merge(me_routes())
        .merge(oauth_routes())
        .layer(api_cors);

    api.merge(discovery_routes())
}
