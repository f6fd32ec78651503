use std::sync::Arc;

use chrono::Utc;
use crypto::{random, token_hash};
use store::{OAuthClient, Store};

use crate::config::OAuthEngineConfig;
use crate::error::{OAuthError, Result};
use crate::models::{RegisterClientRequest, RegisterClientResponse};

/// Dynamic client registration, `POST /oauth/register` (§4.7.1, RFC 7591
/// subset).
pub struct Registrar {
    store: Arc<dyn Store>,
    config: OAuthEngineConfig,
}

impl Registrar {
    pub fn new(store: Arc<dyn Store>, config: OAuthEngineConfig) -> Self {
        Self { store, config }
    }

    pub async fn register(&self, req: RegisterClientRequest) -> Result<RegisterClientResponse> {
        if req.redirect_uris.is_empty() {
            return Err(OAuthError::InvalidRequest(
                "redirect_uris must not be empty".to_string(),
            ));
        }

        for uri in &req.redirect_uris {
            self.validate_redirect_uri(uri)?;
        }

        let client_id = random::client_id();
        let client_secret = random::client_secret();
        let client_secret_hash = token_hash::hash_token(&client_secret)?;

        let client = OAuthClient {
            id: uuid::Uuid::new_v4(),
            client_id: client_id.clone(),
            client_secret_hash,
            display_name: req.client_name.clone(),
            description: None,
            redirect_uris: req.redirect_uris.clone(),
            grant_types: req.grant_types.clone(),
            scopes: req.scope.split_whitespace().map(str::to_string).collect(),
            trusted: false,
            active: true,
            logo_uri: req.logo_uri.clone(),
            client_uri: req.client_uri.clone(),
            token_endpoint_auth_method: req.token_endpoint_auth_method.clone(),
            created_at: Utc::now(),
        };
        let client = self.store.create_client(client).await?;

        Ok(RegisterClientResponse {
            client_id: client.client_id,
            client_secret,
            client_id_issued_at: client.created_at.timestamp(),
            client_name: req.client_name,
            redirect_uris: client.redirect_uris,
            grant_types: client.grant_types,
            response_types: req.response_types,
            scope: client.scopes.join(" "),
            logo_uri: client.logo_uri,
            client_uri: client.client_uri,
            token_endpoint_auth_method: client.token_endpoint_auth_method,
        })
    }

    /// In production every redirect URI must be `https` unless its host is
    /// `localhost` (§4.7.1).
    fn validate_redirect_uri(&self, raw: &str) -> Result<()> {
        let parsed = url::Url::parse(raw)
            .map_err(|_| OAuthError::InvalidRequest(format!("invalid redirect_uri: {raw}")))?;

        if !self.config.production {
            return Ok(());
        }

        let is_localhost = matches!(parsed.host_str(), Some("localhost") | Some("127.0.0.1"));
        if parsed.scheme() != "https" && !is_localhost {
            return Err(OAuthError::InvalidRequest(format!(
                "redirect_uri must use https in production: {raw}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use store::InMemoryStore;

    fn config(production: bool) -> OAuthEngineConfig {
        OAuthEngineConfig {
            issuer: "https://auth.example".to_string(),
            authorization_code_ttl: OAuthEngineConfig::authorization_code_default_ttl(),
            refresh_token_ttl: Duration::from_secs(60 * 60 * 24 * 30),
            supported_scopes: OAuthEngineConfig::default_supported_scopes(),
            production,
        }
    }

    fn request() -> RegisterClientRequest {
        RegisterClientRequest {
            client_name: "Test App".to_string(),
            redirect_uris: vec!["https://app.example/cb".to_string()],
            grant_types: vec!["authorization_code".to_string(), "refresh_token".to_string()],
            response_types: vec!["code".to_string()],
            scope: "openid profile email".to_string(),
            logo_uri: None,
            client_uri: None,
            token_endpoint_auth_method: "client_secret_post".to_string(),
        }
    }

    #[tokio::test]
    async fn registers_a_client_with_a_one_time_secret() {
        let registrar = Registrar::new(Arc::new(InMemoryStore::new()), config(false));
        let response = registrar.register(request()).await.unwrap();
        assert!(response.client_id.starts_with("client_"));
        assert!(!response.client_secret.is_empty());
    }

    #[tokio::test]
    async fn rejects_insecure_redirect_uri_in_production() {
        let registrar = Registrar::new(Arc::new(InMemoryStore::new()), config(true));
        let mut req = request();
        req.redirect_uris = vec!["http://app.example/cb".to_string()];
        let err = registrar.register(req).await.unwrap_err();
        assert!(matches!(err, OAuthError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn allows_insecure_localhost_redirect_uri_in_production() {
        let registrar = Registrar::new(Arc::new(InMemoryStore::new()), config(true));
        let mut req = request();
        req.redirect_uris = vec!["http://localhost:3000/cb".to_string()];
        registrar.register(req).await.unwrap();
    }
}
