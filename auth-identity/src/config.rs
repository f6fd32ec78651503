use std::time::Duration;

/// Token-service tunables. Built by the caller from `config_engine::AppConfig`
/// so this crate stays free of a direct dependency on the config loader.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub jwt_issuer: String,
    pub jwt_audience: Vec<String>,
    pub access_token_ttl: Duration,
    pub id_token_ttl: Duration,
    pub oauth_refresh_token_ttl: Duration,
    pub session_ttl: Duration,
}

impl IdentityConfig {
    pub fn id_token_default_ttl() -> Duration {
        Duration::from_secs(60 * 60)
    }

    pub fn session_default_ttl() -> Duration {
        Duration::from_secs(60 * 60 * 24 * 7)
    }
}
