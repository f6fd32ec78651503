use std::sync::Arc;

use crypto::RsaKeyManager;

use crate::config::OAuthEngineConfig;
use crate::models::{AuthorizationServerMetadata, JwksDocument, ProtectedResourceMetadata};

/// The four `/.well-known/*` documents (§4.7.5). Every one of these must be
/// anonymously reachable — never gated behind the Authenticator — and
/// carries a 1h cache + wildcard CORS at the HTTP layer.
pub struct DiscoveryEndpoint {
    keys: Arc<RsaKeyManager>,
    config: OAuthEngineConfig,
}

impl DiscoveryEndpoint {
    pub fn new(keys: Arc<RsaKeyManager>, config: OAuthEngineConfig) -> Self {
        Self { keys, config }
    }

    pub fn jwks(&self) -> JwksDocument {
        JwksDocument { keys: self.keys.jwks().keys }
    }

    pub fn oauth_authorization_server(&self) -> AuthorizationServerMetadata {
        AuthorizationServerMetadata {
            issuer: self.config.issuer.clone(),
            authorization_endpoint: format!("{}/oauth/authorize", self.config.issuer),
            token_endpoint: format!("{}/oauth/token", self.config.issuer),
            registration_endpoint: format!("{}/oauth/register", self.config.issuer),
            userinfo_endpoint: format!("{}/oauth/userinfo", self.config.issuer),
            jwks_uri: format!("{}/.well-known/jwks.json", self.config.issuer),
            scopes_supported: self.config.supported_scopes.clone(),
            response_types_supported: vec!["code".to_string()],
            grant_types_supported: vec![
                "authorization_code".to_string(),
                "refresh_token".to_string(),
            ],
            code_challenge_methods_supported: vec!["S256".to_string(), "plain".to_string()],
            token_endpoint_auth_methods_supported: vec![
                "client_secret_post".to_string(),
                "client_secret_basic".to_string(),
                "none".to_string(),
            ],
            id_token_signing_alg_values_supported: vec!["RS256".to_string()],
            subject_types_supported: None,
            claims_supported: None,
        }
    }

    pub fn openid_configuration(&self) -> AuthorizationServerMetadata {
        let mut metadata = self.oauth_authorization_server();
        metadata.subject_types_supported = Some(vec!["public".to_string()]);
        metadata.claims_supported = Some(vec![
            "sub".to_string(),
            "email".to_string(),
            "email_verified".to_string(),
            "iss".to_string(),
            "aud".to_string(),
            "exp".to_string(),
            "iat".to_string(),
            "auth_time".to_string(),
        ]);
        metadata
    }

    pub fn oauth_protected_resource(&self) -> ProtectedResourceMetadata {
        ProtectedResourceMetadata {
            resource: self.config.issuer.clone(),
            authorization_servers: vec![self.config.issuer.clone()],
            jwks_uri: format!("{}/.well-known/jwks.json", self.config.issuer),
            scopes_supported: self.config.supported_scopes.clone(),
            bearer_methods_supported: vec!["header".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> OAuthEngineConfig {
        OAuthEngineConfig {
            issuer: "https://auth.example".to_string(),
            authorization_code_ttl: OAuthEngineConfig::authorization_code_default_ttl(),
            refresh_token_ttl: Duration::from_secs(60 * 60 * 24 * 30),
            supported_scopes: OAuthEngineConfig::default_supported_scopes(),
            production: false,
        }
    }

    #[test]
    fn metadata_advertises_both_grants_and_pkce_methods() {
        let keys = Arc::new(RsaKeyManager::load(None, None).unwrap());
        let endpoint = DiscoveryEndpoint::new(keys, config());
        let metadata = endpoint.oauth_authorization_server();
        assert!(metadata.grant_types_supported.contains(&"authorization_code".to_string()));
        assert!(metadata.grant_types_supported.contains(&"refresh_token".to_string()));
        assert!(metadata.code_challenge_methods_supported.contains(&"S256".to_string()));
    }

    #[test]
    fn jwks_kid_matches_the_manager() {
        let keys = Arc::new(RsaKeyManager::load(None, None).unwrap());
        let kid = keys.kid().to_string();
        let endpoint = DiscoveryEndpoint::new(keys, config());
        assert_eq!(endpoint.jwks().keys[0].kid, kid);
    }
}
