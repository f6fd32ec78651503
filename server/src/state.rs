//! Application state (§9 "global singletons → an application context struct
//! threaded through handlers"): every service the HTTP layer needs, built
//! once at startup in the order config-engine → crypto → store → identity →
//! gateway → oauth → email.

use std::sync::Arc;

use axum::extract::FromRef;

use auth_gateway::Authenticator;
use auth_identity::{AccountService, AuthFlows, IdentityConfig, SessionService, TokenService};
use auth_oauth::models::ExternalProvider;
use auth_oauth::{FederatedClient, OAuthEngine, OAuthEngineConfig};
use config_engine::{AppConfig, Environment};
use crypto::rsa_keys::KeySourceConfig;
use crypto::RsaKeyManager;
use email_service::Mailer;
use store::{InMemoryStore, Store};

use crate::error::ApiError;
use crate::middleware::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub keys: Arc<RsaKeyManager>,
    pub tokens: Arc<TokenService>,
    pub accounts: Arc<AccountService>,
    pub sessions: Arc<SessionService>,
    pub auth_flows: Arc<AuthFlows>,
    pub authenticator: Arc<Authenticator>,
    pub oauth: Arc<OAuthEngine>,
    pub mailer: Arc<dyn Mailer>,
    pub google: Option<Arc<FederatedClient>>,
    pub github: Option<Arc<FederatedClient>>,
    pub config: Arc<AppConfig>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl FromRef<AppState> for Arc<Authenticator> {
    fn from_ref(state: &AppState) -> Self {
        state.authenticator.clone()
    }
}

impl AppState {
    /// Wires every service per §2's construction order. The store is
    /// in-memory today (`store::InMemoryStore`); swapping in a persistent
    /// backend only requires changing the `Arc<dyn Store>` constructed here.
    pub fn new(config: AppConfig) -> Result<Self, ApiError> {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());

        let private_key_pem = config
            .jwt_private_key
            .load()
            .map_err(|e| ApiError::Internal(format!("failed to load JWT private key: {e}")))?;
        let keys = Arc::new(
            RsaKeyManager::load(Some(KeySourceConfig::Inline(private_key_pem)), None)
                .map_err(|e| ApiError::Internal(format!("failed to initialize signing key: {e}")))?,
        );

        let identity_config = IdentityConfig {
            jwt_issuer: config.jwt_issuer.clone(),
            jwt_audience: config.jwt_audience.clone(),
            access_token_ttl: config.jwt_expires_in,
            id_token_ttl: IdentityConfig::id_token_default_ttl(),
            oauth_refresh_token_ttl: config.refresh_token_expires_in,
            session_ttl: IdentityConfig::session_default_ttl(),
        };

        // `AuthFlows` owns its services outright (its constructor takes them
        // by value); `Authenticator` needs its own `Arc`-shared copies. Both
        // sets are cheap, stateless wrappers around the same `Arc<dyn Store>`.
        let auth_flows = Arc::new(AuthFlows::new(
            AccountService::new(store.clone()),
            SessionService::new(store.clone(), identity_config.clone()),
            TokenService::new(keys.clone(), identity_config.clone()),
        ));

        let accounts = Arc::new(AccountService::new(store.clone()));
        let sessions = Arc::new(SessionService::new(store.clone(), identity_config.clone()));
        let tokens = Arc::new(TokenService::new(keys.clone(), identity_config.clone()));

        let authenticator = Arc::new(Authenticator::new(
            tokens.clone(),
            accounts.clone(),
            sessions.clone(),
            store.clone(),
        ));

        let oauth_config = OAuthEngineConfig {
            issuer: config.jwt_issuer.clone(),
            authorization_code_ttl: OAuthEngineConfig::authorization_code_default_ttl(),
            refresh_token_ttl: config.refresh_token_expires_in,
            supported_scopes: OAuthEngineConfig::default_supported_scopes(),
            production: config.environment == Environment::Production,
        };
        let oauth = Arc::new(OAuthEngine::new(
            store.clone(),
            keys.clone(),
            tokens.clone(),
            oauth_config,
        ));

        let mailer: Arc<dyn Mailer> =
            Arc::from(email_service::build_mailer(config.resend_api_key.clone(), config.email_from.clone()));

        let google = config.google.as_ref().map(|provider| {
            Arc::new(FederatedClient::new(ExternalProvider {
                name: "google",
                client_id: provider.client_id.clone(),
                client_secret: provider.client_secret.clone(),
                redirect_uri: provider.redirect_uri.clone(),
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
                scopes: vec!["openid".to_string(), "email".to_string(), "profile".to_string()],
            }))
        });
        let github = config.github.as_ref().map(|provider| {
            Arc::new(FederatedClient::new(ExternalProvider {
                name: "github",
                client_id: provider.client_id.clone(),
                client_secret: provider.client_secret.clone(),
                redirect_uri: provider.redirect_uri.clone(),
                authorize_url: "https://github.com/login/oauth/authorize".to_string(),
                token_url: "https://github.com/login/oauth/access_token".to_string(),
                userinfo_url: "https://api.github.com/user".to_string(),
                scopes: vec!["read:user".to_string(), "user:email".to_string()],
            }))
        });

        Ok(Self {
            store,
            keys,
            tokens,
            accounts,
            sessions,
            auth_flows,
            authenticator,
            oauth,
            mailer,
            google,
            github,
            config: Arc::new(config),
            rate_limiter: Arc::new(RateLimiter::new()),
        })
    }
}
