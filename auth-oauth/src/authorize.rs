use std::sync::Arc;

use chrono::{DateTime, Utc};
use crypto::random;
use store::{AuthorizationCode, CodeChallengeMethod, OAuthClient, Store};
use uuid::Uuid;

use crate::config::OAuthEngineConfig;
use crate::error::{OAuthError, Result};
use crate::models::AuthorizeParams;

/// Who is present at the authorize endpoint, if anyone — supplied by the
/// caller from the `auth-gateway` `Principal`, since this crate has no
/// notion of cookies or Bearer headers itself.
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    /// The session's or login's creation time, carried into the ID token's
    /// `auth_time` claim at token-exchange time (§4.7.3 step 5).
    pub auth_time: DateTime<Utc>,
}

/// What the caller (an axum handler) should do in response to an authorize
/// request — translating straight into a redirect, a JSON 400, or a render
/// of the consent UI.
pub enum AuthorizeOutcome {
    /// No principal: redirect to the login UI with the original URL.
    NeedsLogin,
    /// A known, untrusted client the user hasn't approved yet.
    NeedsConsent { client: OAuthClient, scopes: Vec<String> },
    /// Code minted; redirect here.
    Issued { redirect_uri: String, code: String, state: Option<String> },
    /// A scope/consent failure that's still safe to redirect (error query
    /// param), as opposed to `Err` below, which must not redirect.
    Redirected { redirect_uri: String, error: &'static str, state: Option<String> },
}

/// The `GET|POST /oauth/authorize` state machine (§4.7.2).
pub struct AuthorizeEndpoint {
    store: Arc<dyn Store>,
    config: OAuthEngineConfig,
}

impl AuthorizeEndpoint {
    pub fn new(store: Arc<dyn Store>, config: OAuthEngineConfig) -> Self {
        Self { store, config }
    }

    pub async fn decide(
        &self,
        params: &AuthorizeParams,
        principal: Option<&AuthenticatedUser>,
    ) -> Result<AuthorizeOutcome> {
        let Some(principal) = principal else {
            return Ok(AuthorizeOutcome::NeedsLogin);
        };

        if params.response_type != "code" {
            return Err(OAuthError::InvalidRequest(
                "unsupported response_type".to_string(),
            ));
        }

        let client = self
            .store
            .find_client(&params.client_id)
            .await?
            .filter(|c| c.active)
            .ok_or(OAuthError::InvalidClient)?;

        // Exact, byte-for-byte match — trailing slash, query, fragment, or
        // case differences all reject (§4.7.2 step 3, property P5).
        if !client.has_redirect_uri(&params.redirect_uri) {
            return Err(OAuthError::InvalidRequest("Invalid redirect_uri".to_string()));
        }

        let requested_scopes: Vec<&str> = params.scope.split_whitespace().collect();
        if !requested_scopes.iter().all(|s| client.supports_scope(s)) {
            return Ok(AuthorizeOutcome::Redirected {
                redirect_uri: params.redirect_uri.clone(),
                error: "invalid_scope",
                state: params.state.clone(),
            });
        }

        match params.approved.as_deref() {
            Some(approved) if approved != "true" => Ok(AuthorizeOutcome::Redirected {
                redirect_uri: params.redirect_uri.clone(),
                error: "access_denied",
                state: params.state.clone(),
            }),
            Some(_) => {
                self.issue_code(&client, params, principal, &requested_scopes).await
            }
            None if client.trusted => {
                self.issue_code(&client, params, principal, &requested_scopes).await
            }
            None => Ok(AuthorizeOutcome::NeedsConsent {
                client,
                scopes: requested_scopes.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }

    async fn issue_code(
        &self,
        client: &OAuthClient,
        params: &AuthorizeParams,
        principal: &AuthenticatedUser,
        scopes: &[&str],
    ) -> Result<AuthorizeOutcome> {
        let challenge_method = match params.code_challenge_method.as_deref() {
            Some("S256") => Some(CodeChallengeMethod::S256),
            Some("plain") => Some(CodeChallengeMethod::Plain),
            Some(_) => {
                return Err(OAuthError::InvalidRequest(
                    "unsupported code_challenge_method".to_string(),
                ))
            }
            None => None,
        };

        let code = random::authorization_code();
        let now = Utc::now();
        let record = AuthorizationCode {
            id: Uuid::new_v4(),
            code: code.clone(),
            client_id: client.client_id.clone(),
            user_id: principal.user_id,
            redirect_uri: params.redirect_uri.clone(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            expires_at: now + chrono::Duration::from_std(self.config.authorization_code_ttl)
                .unwrap_or_else(|_| chrono::Duration::minutes(10)),
            code_challenge: params.code_challenge.clone(),
            code_challenge_method: challenge_method,
            used: false,
            created_at: now,
        };
        self.store.create_authorization_code(record).await?;

        Ok(AuthorizeOutcome::Issued {
            redirect_uri: params.redirect_uri.clone(),
            code,
            state: params.state.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;
    use store::InMemoryStore;

    fn config() -> OAuthEngineConfig {
        OAuthEngineConfig {
            issuer: "https://auth.example".to_string(),
            authorization_code_ttl: OAuthEngineConfig::authorization_code_default_ttl(),
            refresh_token_ttl: StdDuration::from_secs(60 * 60 * 24 * 30),
            supported_scopes: OAuthEngineConfig::default_supported_scopes(),
            production: false,
        }
    }

    async fn registered_client(store: &InMemoryStore, trusted: bool) -> OAuthClient {
        let client = OAuthClient {
            id: Uuid::new_v4(),
            client_id: "client_abc".to_string(),
            client_secret_hash: "irrelevant".to_string(),
            display_name: "Test".to_string(),
            description: None,
            redirect_uris: vec!["https://app.example/cb".to_string()],
            grant_types: vec!["authorization_code".to_string()],
            scopes: vec!["openid".to_string(), "email".to_string()],
            trusted,
            active: true,
            logo_uri: None,
            client_uri: None,
            token_endpoint_auth_method: "client_secret_post".to_string(),
            created_at: Utc::now(),
        };
        store.create_client(client).await.unwrap()
    }

    fn params() -> AuthorizeParams {
        AuthorizeParams {
            response_type: "code".to_string(),
            client_id: "client_abc".to_string(),
            redirect_uri: "https://app.example/cb".to_string(),
            scope: "openid email".to_string(),
            state: Some("xyz".to_string()),
            code_challenge: None,
            code_challenge_method: None,
            approved: None,
        }
    }

    #[tokio::test]
    async fn trusted_client_skips_consent() {
        let store = Arc::new(InMemoryStore::new());
        registered_client(&store, true).await;
        let endpoint = AuthorizeEndpoint::new(store, config());

        let principal = AuthenticatedUser { user_id: Uuid::new_v4(), auth_time: Utc::now() };
        let outcome = endpoint.decide(&params(), Some(&principal)).await.unwrap();
        assert!(matches!(outcome, AuthorizeOutcome::Issued { .. }));
    }

    #[tokio::test]
    async fn untrusted_client_needs_consent_first() {
        let store = Arc::new(InMemoryStore::new());
        registered_client(&store, false).await;
        let endpoint = AuthorizeEndpoint::new(store, config());

        let principal = AuthenticatedUser { user_id: Uuid::new_v4(), auth_time: Utc::now() };
        let outcome = endpoint.decide(&params(), Some(&principal)).await.unwrap();
        assert!(matches!(outcome, AuthorizeOutcome::NeedsConsent { .. }));
    }

    #[tokio::test]
    async fn mismatched_redirect_uri_rejects_without_redirecting() {
        let store = Arc::new(InMemoryStore::new());
        registered_client(&store, true).await;
        let endpoint = AuthorizeEndpoint::new(store, config());

        let mut p = params();
        p.redirect_uri = "https://app.example/cb/".to_string();
        let principal = AuthenticatedUser { user_id: Uuid::new_v4(), auth_time: Utc::now() };
        let err = endpoint.decide(&p, Some(&principal)).await.unwrap_err();
        assert!(matches!(err, OAuthError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn scope_outside_client_registration_redirects_invalid_scope() {
        let store = Arc::new(InMemoryStore::new());
        registered_client(&store, true).await;
        let endpoint = AuthorizeEndpoint::new(store, config());

        let mut p = params();
        p.scope = "openid email admin".to_string();
        let principal = AuthenticatedUser { user_id: Uuid::new_v4(), auth_time: Utc::now() };
        let outcome = endpoint.decide(&p, Some(&principal)).await.unwrap();
        assert!(matches!(
            outcome,
            AuthorizeOutcome::Redirected { error: "invalid_scope", .. }
        ));
    }

    #[tokio::test]
    async fn no_principal_needs_login() {
        let store = Arc::new(InMemoryStore::new());
        let endpoint = AuthorizeEndpoint::new(store, config());
        let outcome = endpoint.decide(&params(), None).await.unwrap();
        assert!(matches!(outcome, AuthorizeOutcome::NeedsLogin));
    }
}
