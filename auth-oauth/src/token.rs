use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use crypto::{constant_time, random, token_hash};
use sha2::{Digest, Sha256};
use store::{CodeChallengeMethod, OAuthClient, OAuthRefreshToken, Store};
use uuid::Uuid;

use auth_identity::TokenService;

use crate::config::OAuthEngineConfig;
use crate::error::{OAuthError, Result};
use crate::models::{TokenRequest, TokenResponse};

/// `POST /oauth/token` (§4.7.3): both the `authorization_code` and
/// `refresh_token` grants, discriminated by `grant_type`.
pub struct TokenEndpoint {
    store: Arc<dyn Store>,
    tokens: Arc<TokenService>,
    config: OAuthEngineConfig,
}

impl TokenEndpoint {
    pub fn new(store: Arc<dyn Store>, tokens: Arc<TokenService>, config: OAuthEngineConfig) -> Self {
        Self { store, tokens, config }
    }

    pub async fn exchange(&self, req: TokenRequest) -> Result<TokenResponse> {
        match req.grant_type.as_str() {
            "authorization_code" => self.exchange_authorization_code(req).await,
            "refresh_token" => self.exchange_refresh_token(req).await,
            _ => Err(OAuthError::UnsupportedGrantType),
        }
    }

    async fn authenticate_client(&self, client_id: &str, client_secret: Option<&str>) -> Result<OAuthClient> {
        let client = self
            .store
            .find_client(client_id)
            .await?
            .filter(|c| c.active)
            .ok_or(OAuthError::InvalidClient)?;

        let secret = client_secret.ok_or(OAuthError::InvalidClient)?;
        if !token_hash::verify_token(secret, &client.client_secret_hash)? {
            return Err(OAuthError::InvalidClient);
        }
        Ok(client)
    }

    async fn exchange_authorization_code(&self, req: TokenRequest) -> Result<TokenResponse> {
        let code = req.code.ok_or_else(|| OAuthError::InvalidRequest("code is required".to_string()))?;
        let redirect_uri = req
            .redirect_uri
            .ok_or_else(|| OAuthError::InvalidRequest("redirect_uri is required".to_string()))?;

        let client = self.authenticate_client(&req.client_id, req.client_secret.as_deref()).await?;

        let Some(record) = self.store.consume_authorization_code(&code).await? else {
            // Either unknown, expired, or already used. If it was already
            // used, it still exists (marked `used=true`) — look it up to
            // find the client/user a replay targets and revoke every
            // refresh token that exchange produced (§4.7.3 step 2).
            if let Some(stale) = self.store.find_authorization_code_by_code(&code).await? {
                if stale.used {
                    self.store
                        .revoke_refresh_tokens_for_client_user(&stale.client_id, stale.user_id)
                        .await?;
                }
            }
            return Err(OAuthError::InvalidGrant);
        };

        if record.client_id != client.client_id || record.redirect_uri != redirect_uri {
            return Err(OAuthError::InvalidGrant);
        }

        if let Some(challenge) = &record.code_challenge {
            let verifier = req
                .code_verifier
                .ok_or_else(|| OAuthError::InvalidRequest("code_verifier is required".to_string()))?;
            let computed = match record.code_challenge_method {
                Some(CodeChallengeMethod::S256) => {
                    let digest = Sha256::digest(verifier.as_bytes());
                    URL_SAFE_NO_PAD.encode(digest)
                }
                Some(CodeChallengeMethod::Plain) | None => verifier.clone(),
            };
            if !constant_time::ct_eq_str(&computed, challenge) {
                return Err(OAuthError::InvalidGrant);
            }
        }

        self.issue_tokens(&client, record.user_id, &record.scopes, None, record.created_at)
            .await
    }

    async fn exchange_refresh_token(&self, req: TokenRequest) -> Result<TokenResponse> {
        let presented = req
            .refresh_token
            .ok_or_else(|| OAuthError::InvalidRequest("refresh_token is required".to_string()))?;

        let client = self.authenticate_client(&req.client_id, req.client_secret.as_deref()).await?;

        let (id_part, secret_part) = presented
            .split_once('.')
            .ok_or(OAuthError::InvalidGrant)?;
        let token_id = Uuid::parse_str(id_part).map_err(|_| OAuthError::InvalidGrant)?;

        let record = self
            .store
            .find_refresh_token_by_id(token_id)
            .await?
            .ok_or(OAuthError::InvalidGrant)?;

        if record.client_id != client.client_id {
            return Err(OAuthError::InvalidGrant);
        }

        if record.revoked {
            // Reuse of an already-rotated-out token: revoke the whole
            // lineage before failing (§4.7.3 step 3, property P6).
            self.store.revoke_refresh_token_family(record.family_id).await?;
            return Err(OAuthError::InvalidGrant);
        }
        if record.is_expired(Utc::now()) {
            return Err(OAuthError::InvalidGrant);
        }
        if !token_hash::verify_token(secret_part, &record.token_hash)? {
            return Err(OAuthError::InvalidGrant);
        }

        self.store.revoke_refresh_token(record.id).await?;

        self.issue_tokens_with_family(
            &client,
            record.user_id,
            &record.scopes,
            None,
            record.created_at,
            record.family_id,
        )
        .await
    }

    async fn issue_tokens(
        &self,
        client: &OAuthClient,
        user_id: Uuid,
        scopes: &[String],
        nonce: Option<&str>,
        auth_time: chrono::DateTime<Utc>,
    ) -> Result<TokenResponse> {
        self.issue_tokens_with_family(client, user_id, scopes, nonce, auth_time, Uuid::new_v4())
            .await
    }

    async fn issue_tokens_with_family(
        &self,
        client: &OAuthClient,
        user_id: Uuid,
        scopes: &[String],
        nonce: Option<&str>,
        auth_time: chrono::DateTime<Utc>,
        family_id: Uuid,
    ) -> Result<TokenResponse> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(OAuthError::InvalidGrant)?;

        let scope_str = scopes.join(" ");
        let access = self.tokens.issue_access_token(
            &user.id.to_string(),
            Some(&user.email),
            Some(&client.client_id),
            Some(&scope_str),
        )?;

        let refresh_secret = random::opaque_token();
        let refresh_record = OAuthRefreshToken {
            id: Uuid::new_v4(),
            token_hash: token_hash::hash_token(&refresh_secret)?,
            client_id: client.client_id.clone(),
            user_id,
            scopes: scopes.to_vec(),
            family_id,
            expires_at: Utc::now()
                + chrono::Duration::from_std(self.config.refresh_token_ttl)
                    .unwrap_or_else(|_| chrono::Duration::days(30)),
            revoked: false,
            created_at: Utc::now(),
        };
        let refresh_record = self.store.create_refresh_token(refresh_record).await?;
        let refresh_token = format!("{}.{}", refresh_record.id, refresh_secret);

        let id_token = if scopes.iter().any(|s| s == "openid") {
            Some(self.tokens.issue_id_token(
                &user.id.to_string(),
                &client.client_id,
                Some(&user.email),
                Some(user.email_verified),
                nonce,
                auth_time,
            )?)
        } else {
            None
        };

        Ok(TokenResponse {
            access_token: access.token,
            token_type: "Bearer".to_string(),
            expires_in: access.expires_in,
            refresh_token,
            scope: scope_str,
            id_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    use auth_identity::IdentityConfig;
    use crypto::RsaKeyManager;
    use store::{InMemoryStore, User};

    fn config() -> OAuthEngineConfig {
        OAuthEngineConfig {
            issuer: "https://auth.example".to_string(),
            authorization_code_ttl: OAuthEngineConfig::authorization_code_default_ttl(),
            refresh_token_ttl: StdDuration::from_secs(60 * 60 * 24 * 30),
            supported_scopes: OAuthEngineConfig::default_supported_scopes(),
            production: false,
        }
    }

    fn identity_config() -> IdentityConfig {
        IdentityConfig {
            jwt_issuer: "https://auth.example".to_string(),
            jwt_audience: vec!["https://auth.example".to_string()],
            access_token_ttl: StdDuration::from_secs(900),
            id_token_ttl: IdentityConfig::id_token_default_ttl(),
            oauth_refresh_token_ttl: StdDuration::from_secs(60 * 60 * 24 * 30),
            session_ttl: IdentityConfig::session_default_ttl(),
        }
    }

    async fn endpoint() -> (TokenEndpoint, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let keys = Arc::new(RsaKeyManager::load(None, None).unwrap());
        let tokens = Arc::new(TokenService::new(keys, identity_config()));
        let endpoint = TokenEndpoint::new(store.clone(), tokens, config());
        (endpoint, store)
    }

    async fn seed_client(store: &InMemoryStore, secret: &str) -> OAuthClient {
        let client = OAuthClient {
            id: Uuid::new_v4(),
            client_id: "client_abc".to_string(),
            client_secret_hash: token_hash::hash_token(secret).unwrap(),
            display_name: "Test".to_string(),
            description: None,
            redirect_uris: vec!["https://app.example/cb".to_string()],
            grant_types: vec!["authorization_code".to_string(), "refresh_token".to_string()],
            scopes: vec!["openid".to_string(), "email".to_string()],
            trusted: true,
            active: true,
            logo_uri: None,
            client_uri: None,
            token_endpoint_auth_method: "client_secret_post".to_string(),
            created_at: Utc::now(),
        };
        store.create_client(client).await.unwrap()
    }

    async fn seed_user(store: &InMemoryStore) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.c".to_string(),
            password_hash: "irrelevant".to_string(),
            email_verified: true,
            is_admin: false,
            federated_provider: None,
            federated_account_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.create_user(user).await.unwrap()
    }

    async fn seed_code(
        store: &InMemoryStore,
        client_id: &str,
        user_id: Uuid,
        challenge: Option<(String, CodeChallengeMethod)>,
    ) -> String {
        let code = "test-code".to_string();
        let (code_challenge, code_challenge_method) = match challenge {
            Some((c, m)) => (Some(c), Some(m)),
            None => (None, None),
        };
        store
            .create_authorization_code(store::AuthorizationCode {
                id: Uuid::new_v4(),
                code: code.clone(),
                client_id: client_id.to_string(),
                user_id,
                redirect_uri: "https://app.example/cb".to_string(),
                scopes: vec!["openid".to_string(), "email".to_string()],
                expires_at: Utc::now() + chrono::Duration::minutes(10),
                code_challenge,
                code_challenge_method,
                used: false,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        code
    }

    fn base_request(client_id: &str, secret: &str) -> TokenRequest {
        TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: None,
            redirect_uri: Some("https://app.example/cb".to_string()),
            client_id: client_id.to_string(),
            client_secret: Some(secret.to_string()),
            code_verifier: None,
            refresh_token: None,
        }
    }

    #[tokio::test]
    async fn exchanges_code_with_pkce_s256() {
        let (endpoint, store) = endpoint().await;
        let client = seed_client(&store, "s3cr3t").await;
        let user = seed_user(&store).await;

        let verifier = "a-very-long-pkce-code-verifier-value-1234567890";
        let digest = Sha256::digest(verifier.as_bytes());
        let challenge = URL_SAFE_NO_PAD.encode(digest);
        let code = seed_code(
            &store,
            &client.client_id,
            user.id,
            Some((challenge, CodeChallengeMethod::S256)),
        )
        .await;

        let mut req = base_request(&client.client_id, "s3cr3t");
        req.code = Some(code);
        req.code_verifier = Some(verifier.to_string());

        let response = endpoint.exchange(req).await.unwrap();
        assert!(response.id_token.is_some());
        assert!(response.refresh_token.contains('.'));
    }

    #[tokio::test]
    async fn rejects_mismatched_pkce_verifier() {
        let (endpoint, store) = endpoint().await;
        let client = seed_client(&store, "s3cr3t").await;
        let user = seed_user(&store).await;

        let digest = Sha256::digest(b"the-real-verifier");
        let challenge = URL_SAFE_NO_PAD.encode(digest);
        let code = seed_code(
            &store,
            &client.client_id,
            user.id,
            Some((challenge, CodeChallengeMethod::S256)),
        )
        .await;

        let mut req = base_request(&client.client_id, "s3cr3t");
        req.code = Some(code);
        req.code_verifier = Some("not-the-real-verifier".to_string());

        let err = endpoint.exchange(req).await.unwrap_err();
        assert!(matches!(err, OAuthError::InvalidGrant));
    }

    #[tokio::test]
    async fn rejects_redirect_uri_mismatch() {
        let (endpoint, store) = endpoint().await;
        let client = seed_client(&store, "s3cr3t").await;
        let user = seed_user(&store).await;
        let code = seed_code(&store, &client.client_id, user.id, None).await;

        let mut req = base_request(&client.client_id, "s3cr3t");
        req.code = Some(code);
        req.redirect_uri = Some("https://app.example/other".to_string());

        let err = endpoint.exchange(req).await.unwrap_err();
        assert!(matches!(err, OAuthError::InvalidGrant));
    }

    #[tokio::test]
    async fn replaying_a_used_code_revokes_its_refresh_tokens() {
        let (endpoint, store) = endpoint().await;
        let client = seed_client(&store, "s3cr3t").await;
        let user = seed_user(&store).await;
        let code = seed_code(&store, &client.client_id, user.id, None).await;

        let mut req = base_request(&client.client_id, "s3cr3t");
        req.code = Some(code.clone());
        let first = endpoint.exchange(req).await.unwrap();

        let mut replay = base_request(&client.client_id, "s3cr3t");
        replay.code = Some(code);
        let err = endpoint.exchange(replay).await.unwrap_err();
        assert!(matches!(err, OAuthError::InvalidGrant));

        let (id_part, _) = first.refresh_token.split_once('.').unwrap();
        let record = store
            .find_refresh_token_by_id(Uuid::parse_str(id_part).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(record.revoked);
    }

    #[tokio::test]
    async fn rotates_refresh_token_and_detects_reuse() {
        let (endpoint, store) = endpoint().await;
        let client = seed_client(&store, "s3cr3t").await;
        let user = seed_user(&store).await;
        let code = seed_code(&store, &client.client_id, user.id, None).await;

        let mut req = base_request(&client.client_id, "s3cr3t");
        req.code = Some(code);
        let issued = endpoint.exchange(req).await.unwrap();

        let mut refresh_req = TokenRequest {
            grant_type: "refresh_token".to_string(),
            code: None,
            redirect_uri: None,
            client_id: client.client_id.clone(),
            client_secret: Some("s3cr3t".to_string()),
            code_verifier: None,
            refresh_token: Some(issued.refresh_token.clone()),
        };
        let rotated = endpoint.exchange(refresh_req.clone()).await.unwrap();
        assert_ne!(rotated.refresh_token, issued.refresh_token);

        // Reusing the now-rotated-out token must revoke the whole family.
        let reuse = endpoint.exchange(refresh_req.clone()).await.unwrap_err();
        assert!(matches!(reuse, OAuthError::InvalidGrant));

        refresh_req.refresh_token = Some(rotated.refresh_token);
        let after_family_revocation = endpoint.exchange(refresh_req).await.unwrap_err();
        assert!(matches!(after_family_revocation, OAuthError::InvalidGrant));
    }
}
