use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::models::{
    AuthorizationCode, MagicLinkToken, MagicLinkTokenType, OAuthClient, OAuthRefreshToken,
    Session, User, UserApiKey,
};
use crate::traits::Store;

/// Reference `Store` implementation backed by in-process `RwLock<HashMap>`s.
/// Used by tests and local development; not meant to survive a restart.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    sessions: RwLock<HashMap<String, Session>>,
    clients: RwLock<HashMap<String, OAuthClient>>,
    authorization_codes: RwLock<HashMap<String, AuthorizationCode>>,
    refresh_tokens: RwLock<HashMap<Uuid, OAuthRefreshToken>>,
    api_keys: RwLock<HashMap<Uuid, UserApiKey>>,
    magic_link_tokens: RwLock<HashMap<Uuid, MagicLinkToken>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let target = normalize_email(email);
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| normalize_email(&u.email) == target)
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_federated_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| {
                u.federated_provider.as_deref() == Some(provider)
                    && u.federated_account_id.as_deref() == Some(provider_account_id)
            })
            .cloned())
    }

    async fn create_user(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;
        let target_email = normalize_email(&user.email);
        if users.values().any(|u| normalize_email(&u.email) == target_email) {
            return Err(StoreError::DuplicateEmail);
        }
        if let Some(provider) = &user.federated_provider {
            let account_id = user.federated_account_id.as_deref().unwrap_or_default();
            if users.values().any(|u| {
                u.federated_provider.as_deref() == Some(provider.as_str())
                    && u.federated_account_id.as_deref() == Some(account_id)
            }) {
                return Err(StoreError::DuplicateFederatedAccount);
            }
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        self.users.write().await.remove(&id);
        self.sessions.write().await.retain(|_, s| s.user_id != id);
        self.api_keys.write().await.retain(|_, k| k.user_id != id);
        self.magic_link_tokens
            .write()
            .await
            .retain(|_, t| t.user_id != id);
        Ok(())
    }

    async fn create_session(&self, session: Session) -> Result<Session> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn delete_session(&self, id: &str) -> Result<()> {
        self.sessions.write().await.remove(id);
        Ok(())
    }

    async fn delete_sessions_by_user(&self, user_id: Uuid) -> Result<()> {
        self.sessions.write().await.retain(|_, s| s.user_id != user_id);
        Ok(())
    }

    async fn create_client(&self, client: OAuthClient) -> Result<OAuthClient> {
        let mut clients = self.clients.write().await;
        if clients.contains_key(&client.client_id) {
            return Err(StoreError::DuplicateClientId);
        }
        clients.insert(client.client_id.clone(), client.clone());
        Ok(client)
    }

    async fn find_client(&self, client_id: &str) -> Result<Option<OAuthClient>> {
        Ok(self.clients.read().await.get(client_id).cloned())
    }

    async fn update_client(&self, client: OAuthClient) -> Result<OAuthClient> {
        let mut clients = self.clients.write().await;
        if !clients.contains_key(&client.client_id) {
            return Err(StoreError::NotFound);
        }
        clients.insert(client.client_id.clone(), client.clone());
        Ok(client)
    }

    async fn delete_client(&self, client_id: &str) -> Result<()> {
        self.clients.write().await.remove(client_id);
        self.authorization_codes
            .write()
            .await
            .retain(|_, c| c.client_id != client_id);
        self.refresh_tokens
            .write()
            .await
            .retain(|_, t| t.client_id != client_id);
        Ok(())
    }

    async fn create_authorization_code(
        &self,
        code: AuthorizationCode,
    ) -> Result<AuthorizationCode> {
        let mut codes = self.authorization_codes.write().await;
        if codes.contains_key(&code.code) {
            return Err(StoreError::DuplicateIdentifier);
        }
        codes.insert(code.code.clone(), code.clone());
        Ok(code)
    }

    async fn consume_authorization_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        // A single write-lock critical section makes this compare-and-set
        // atomic: only the first caller to observe `used == false` can flip
        // it, and every later caller — concurrent or not — sees `used ==
        // true` and gets `None`.
        let mut codes = self.authorization_codes.write().await;
        let Some(record) = codes.get_mut(code) else {
            return Ok(None);
        };
        if record.used || record.is_expired(chrono::Utc::now()) {
            return Ok(None);
        }
        record.used = true;
        Ok(Some(record.clone()))
    }

    async fn find_authorization_code_by_code(
        &self,
        code: &str,
    ) -> Result<Option<AuthorizationCode>> {
        Ok(self.authorization_codes.read().await.get(code).cloned())
    }

    async fn create_refresh_token(&self, token: OAuthRefreshToken) -> Result<OAuthRefreshToken> {
        self.refresh_tokens.write().await.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_refresh_token_by_id(&self, id: Uuid) -> Result<Option<OAuthRefreshToken>> {
        Ok(self.refresh_tokens.read().await.get(&id).cloned())
    }

    async fn revoke_refresh_token(&self, id: Uuid) -> Result<()> {
        if let Some(token) = self.refresh_tokens.write().await.get_mut(&id) {
            token.revoked = true;
        }
        Ok(())
    }

    async fn revoke_refresh_token_family(&self, family_id: Uuid) -> Result<()> {
        for token in self.refresh_tokens.write().await.values_mut() {
            if token.family_id == family_id {
                token.revoked = true;
            }
        }
        Ok(())
    }

    async fn revoke_refresh_tokens_for_client_user(
        &self,
        client_id: &str,
        user_id: Uuid,
    ) -> Result<()> {
        for token in self.refresh_tokens.write().await.values_mut() {
            if token.client_id == client_id && token.user_id == user_id {
                token.revoked = true;
            }
        }
        Ok(())
    }

    async fn create_api_key(&self, key: UserApiKey) -> Result<UserApiKey> {
        let mut keys = self.api_keys.write().await;
        if keys.values().any(|k| k.prefix == key.prefix) {
            return Err(StoreError::DuplicateIdentifier);
        }
        keys.insert(key.id, key.clone());
        Ok(key)
    }

    async fn find_api_key_by_prefix(&self, prefix: &str) -> Result<Option<UserApiKey>> {
        Ok(self
            .api_keys
            .read()
            .await
            .values()
            .find(|k| k.prefix == prefix)
            .cloned())
    }

    async fn list_api_keys_by_user(&self, user_id: Uuid) -> Result<Vec<UserApiKey>> {
        Ok(self
            .api_keys
            .read()
            .await
            .values()
            .filter(|k| k.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_api_key(&self, id: Uuid) -> Result<()> {
        self.api_keys.write().await.remove(&id);
        Ok(())
    }

    async fn touch_api_key_last_used(&self, id: Uuid) -> Result<()> {
        if let Some(key) = self.api_keys.write().await.get_mut(&id) {
            key.last_used_at = Some(chrono::Utc::now());
        }
        Ok(())
    }

    async fn create_magic_link_token(&self, token: MagicLinkToken) -> Result<MagicLinkToken> {
        self.magic_link_tokens
            .write()
            .await
            .insert(token.id, token.clone());
        Ok(token)
    }

    async fn list_unused_magic_link_tokens_by_type(
        &self,
        user_id: Uuid,
        token_type: MagicLinkTokenType,
    ) -> Result<Vec<MagicLinkToken>> {
        Ok(self
            .magic_link_tokens
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id && t.token_type == token_type && !t.used)
            .cloned()
            .collect())
    }

    async fn mark_magic_link_token_used(&self, id: Uuid) -> Result<()> {
        if let Some(token) = self.magic_link_tokens.write().await.get_mut(&id) {
            token.used = true;
        }
        Ok(())
    }

    async fn invalidate_user_magic_link_tokens(
        &self,
        user_id: Uuid,
        token_type: MagicLinkTokenType,
    ) -> Result<()> {
        for token in self.magic_link_tokens.write().await.values_mut() {
            if token.user_id == user_id && token.token_type == token_type {
                token.used = true;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@b.c".to_string(),
            password_hash: "hash".to_string(),
            email_verified: false,
            is_admin: false,
            federated_provider: None,
            federated_account_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_email_case_insensitively() {
        let store = InMemoryStore::new();
        store.create_user(sample_user()).await.unwrap();

        let mut dup = sample_user();
        dup.email = "A@B.C".to_string();
        let result = store.create_user(dup).await;
        assert!(matches!(result, Err(StoreError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn authorization_code_is_single_use() {
        let store = InMemoryStore::new();
        let code = AuthorizationCode {
            id: Uuid::new_v4(),
            code: "abc123".to_string(),
            client_id: "client_x".to_string(),
            user_id: Uuid::new_v4(),
            redirect_uri: "https://app.example/cb".to_string(),
            scopes: vec!["openid".to_string()],
            expires_at: Utc::now() + chrono::Duration::minutes(10),
            code_challenge: None,
            code_challenge_method: None,
            used: false,
            created_at: Utc::now(),
        };
        store.create_authorization_code(code).await.unwrap();

        let first = store.consume_authorization_code("abc123").await.unwrap();
        assert!(first.is_some());

        let second = store.consume_authorization_code("abc123").await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn concurrent_consume_has_exactly_one_winner() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryStore::new());
        let code = AuthorizationCode {
            id: Uuid::new_v4(),
            code: "racey".to_string(),
            client_id: "client_x".to_string(),
            user_id: Uuid::new_v4(),
            redirect_uri: "https://app.example/cb".to_string(),
            scopes: vec![],
            expires_at: Utc::now() + chrono::Duration::minutes(10),
            code_challenge: None,
            code_challenge_method: None,
            used: false,
            created_at: Utc::now(),
        };
        store.create_authorization_code(code).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.consume_authorization_code("racey").await.unwrap().is_some()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn revoking_by_client_and_user_ignores_other_families() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let other_user = Uuid::new_v4();
        for user in [user_id, user_id, other_user] {
            let token = OAuthRefreshToken {
                id: Uuid::new_v4(),
                token_hash: "hash".to_string(),
                client_id: "client_x".to_string(),
                user_id: user,
                scopes: vec![],
                family_id: Uuid::new_v4(),
                expires_at: Utc::now() + chrono::Duration::days(30),
                revoked: false,
                created_at: Utc::now(),
            };
            store.create_refresh_token(token).await.unwrap();
        }

        store
            .revoke_refresh_tokens_for_client_user("client_x", user_id)
            .await
            .unwrap();

        let tokens = store.refresh_tokens.read().await;
        let (revoked, untouched): (Vec<_>, Vec<_>) =
            tokens.values().partition(|t| t.user_id == user_id);
        assert!(revoked.iter().all(|t| t.revoked));
        assert!(untouched.iter().all(|t| !t.revoked));
    }

    #[tokio::test]
    async fn revoking_a_family_revokes_every_descendant() {
        let store = InMemoryStore::new();
        let family_id = Uuid::new_v4();
        for _ in 0..3 {
            let token = OAuthRefreshToken {
                id: Uuid::new_v4(),
                token_hash: "hash".to_string(),
                client_id: "client_x".to_string(),
                user_id: Uuid::new_v4(),
                scopes: vec![],
                family_id,
                expires_at: Utc::now() + chrono::Duration::days(30),
                revoked: false,
                created_at: Utc::now(),
            };
            store.create_refresh_token(token).await.unwrap();
        }

        store.revoke_refresh_token_family(family_id).await.unwrap();

        let all_revoked = store
            .refresh_tokens
            .read()
            .await
            .values()
            .all(|t| t.revoked);
        assert!(all_revoked);
    }
}
