use std::time::Duration;

/// Tunables for the OAuth engine, built by the caller from
/// `config_engine::AppConfig` the same way `auth_identity::IdentityConfig`
/// is.
#[derive(Debug, Clone)]
pub struct OAuthEngineConfig {
    pub issuer: String,
    pub authorization_code_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub supported_scopes: Vec<String>,
    /// `https`-only redirect URIs are enforced at registration time unless
    /// the host is `localhost` — this flag mirrors `NODE_ENV=production`.
    pub production: bool,
}

impl OAuthEngineConfig {
    pub fn authorization_code_default_ttl() -> Duration {
        Duration::from_secs(10 * 60)
    }

    pub fn default_supported_scopes() -> Vec<String> {
        vec![
            "openid".to_string(),
            "profile".to_string(),
            "email".to_string(),
        ]
    }
}
