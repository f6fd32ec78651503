use std::fmt;
use std::time::Duration;

use crate::duration::parse_duration_literal;
use crate::error::{ConfigError, Result};

/// Deployment environment, read from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(ConfigError::InvalidValue {
                name: "NODE_ENV".to_string(),
                reason: format!("expected development/production/test, got \"{other}\""),
            }),
        }
    }
}

/// Either the PEM is inline in the environment variable, or the variable
/// names a file on disk that holds it — matching the `JWT_PRIVATE_KEY` /
/// `JWT_PRIVATE_KEY` (or file path) configuration surface.
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    Inline(String),
    Path(String),
}

impl KeyMaterial {
    fn from_env(var: &str) -> Option<Self> {
        let raw = std::env::var(var).ok()?;
        if raw.trim_start().starts_with("-----BEGIN") {
            Some(KeyMaterial::Inline(raw))
        } else {
            Some(KeyMaterial::Path(raw))
        }
    }

    pub fn load(&self) -> Result<String> {
        match self {
            KeyMaterial::Inline(pem) => Ok(pem.clone()),
            KeyMaterial::Path(path) => std::fs::read_to_string(path).map_err(|source| {
                ConfigError::KeyFile {
                    path: path.clone(),
                    source,
                }
            }),
        }
    }
}

/// Credentials for one federated identity provider (Google or GitHub).
#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl OAuthProviderConfig {
    fn from_env(prefix: &str) -> Option<Self> {
        let client_id = std::env::var(format!("{prefix}_ID")).ok()?;
        let client_secret = std::env::var(format!("{prefix}_SECRET")).ok()?;
        let redirect_uri = std::env::var(format!("{prefix}_REDIRECT_URI")).ok()?;
        Some(Self {
            client_id,
            client_secret,
            redirect_uri,
        })
    }
}

/// Top-level application configuration, loaded once at startup from the
/// process environment (`.env` is loaded first via `dotenvy`, for local
/// development convenience — it never overrides a variable already set).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: String,
    pub session_secret: String,

    pub jwt_private_key: KeyMaterial,
    pub jwt_public_key: Option<KeyMaterial>,
    pub jwt_issuer: String,
    pub jwt_audience: Vec<String>,
    pub jwt_expires_in: Duration,
    pub refresh_token_expires_in: Duration,

    pub google: Option<OAuthProviderConfig>,
    pub github: Option<OAuthProviderConfig>,

    pub email_from: String,
    pub resend_api_key: Option<String>,

    pub cors_origin: String,
}

impl AppConfig {
    /// Loads configuration from the environment, validating required
    /// production secrets so misconfiguration is a startup failure rather
    /// than a runtime surprise.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let environment: Environment = env_or("NODE_ENV", "development")?.parse()?;

        let host = env_or("HOST", "0.0.0.0")?;
        let port: u16 = env_or("PORT", "8080")?
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                name: "PORT".to_string(),
                reason: "expected a u16".to_string(),
            })?;
        let log_level = env_or("LOG_LEVEL", "info")?;

        let database_url = require_env("DATABASE_URL")?;
        let session_secret = require_env("SESSION_SECRET")?;

        if environment == Environment::Production && session_secret.len() < 32 {
            return Err(ConfigError::InvalidValue {
                name: "SESSION_SECRET".to_string(),
                reason: "must be at least 32 bytes in production".to_string(),
            });
        }

        let jwt_private_key = KeyMaterial::from_env("JWT_PRIVATE_KEY").ok_or_else(|| {
            ConfigError::MissingVar("JWT_PRIVATE_KEY".to_string())
        })?;
        let jwt_public_key = KeyMaterial::from_env("JWT_PUBLIC_KEY");
        let jwt_issuer = require_env("JWT_ISSUER")?;
        let jwt_audience = require_env("JWT_AUDIENCE")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let jwt_expires_in =
            parse_duration_literal("JWT_EXPIRES_IN", &env_or("JWT_EXPIRES_IN", "15m")?)?;
        let refresh_token_expires_in = parse_duration_literal(
            "REFRESH_TOKEN_EXPIRES_IN",
            &env_or("REFRESH_TOKEN_EXPIRES_IN", "30d")?,
        )?;

        let google = OAuthProviderConfig::from_env("GOOGLE_CLIENT");
        let github = OAuthProviderConfig::from_env("GITHUB_CLIENT");

        let email_from = require_env("EMAIL_FROM")?;
        let resend_api_key = std::env::var("RESEND_API_KEY").ok();

        let cors_origin = env_or("CORS_ORIGIN", "*")?;

        Ok(Self {
            environment,
            host,
            port,
            log_level,
            database_url,
            session_secret,
            jwt_private_key,
            jwt_public_key,
            jwt_issuer,
            jwt_audience,
            jwt_expires_in,
            refresh_token_expires_in,
            google,
            github,
            email_from,
            resend_api_key,
            cors_origin,
        })
    }
}

fn env_or(name: &str, default: &str) -> Result<String> {
    Ok(std::env::var(name).unwrap_or_else(|_| default.to_string()))
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}
