use std::sync::Arc;

use chrono::Utc;
use crypto::{random, token_hash, Argon2Params, Kdf, PasswordStrength};
use store::{MagicLinkToken, MagicLinkTokenType, Store, User, UserApiKey};
use uuid::Uuid;

use crate::error::{IdentityError, Result};
use crate::models::IssuedApiKey;

const MAX_ACTIVE_API_KEYS: usize = 10;
const EMAIL_VERIFICATION_TTL_HOURS: i64 = 24;
const PASSWORD_RESET_TTL_HOURS: i64 = 1;
const API_KEY_PREFIX_NAMESPACE: &str = "koa";
const API_KEY_RANDOM_PREFIX_LEN: usize = 6;

fn magic_link_ttl(token_type: MagicLinkTokenType) -> chrono::Duration {
    match token_type {
        MagicLinkTokenType::EmailVerification => chrono::Duration::hours(EMAIL_VERIFICATION_TTL_HOURS),
        MagicLinkTokenType::PasswordReset => chrono::Duration::hours(PASSWORD_RESET_TTL_HOURS),
    }
}

/// Core account flows of §4.8 that don't involve minting a JWT or a
/// browser session directly: registration, password changes, magic-link
/// issuance/consumption, federated account linking, and personal API keys.
/// `AuthService` composes this with `SessionService`/`TokenService` to
/// implement the full signup/login/refresh surface.
pub struct AccountService {
    store: Arc<dyn Store>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Unicode-lowercase + trim, per §4.8.
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    pub async fn find_user(&self, user_id: Uuid) -> Result<User> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        let email = Self::normalize_email(email);
        if !PasswordStrength::is_strong(password) {
            return Err(IdentityError::WeakPassword);
        }
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(IdentityError::EmailAlreadyInUse);
        }

        let password_hash = Kdf::argon2_hash(password.as_bytes(), &Argon2Params::default())?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash,
            email_verified: false,
            is_admin: false,
            federated_provider: None,
            federated_account_id: None,
            created_at: now,
            updated_at: now,
        };
        Ok(self.store.create_user(user).await?)
    }

    /// Enumeration-safe: every failure path returns the same generic error.
    pub async fn authenticate_password(&self, email: &str, password: &str) -> Result<User> {
        let email = Self::normalize_email(email);
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        if !Kdf::argon2_verify(password.as_bytes(), &user.password_hash)? {
            return Err(IdentityError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        if !Kdf::argon2_verify(old_password.as_bytes(), &user.password_hash)? {
            return Err(IdentityError::InvalidCredentials);
        }
        if !PasswordStrength::is_strong(new_password) {
            return Err(IdentityError::WeakPassword);
        }

        let mut updated = user;
        updated.password_hash = Kdf::argon2_hash(new_password.as_bytes(), &Argon2Params::default())?;
        updated.updated_at = Utc::now();
        self.store.update_user(updated).await?;
        Ok(())
    }

    /// `FindOrCreateUser`, per §4.8's federated-login rule: match by
    /// `(provider, provider_account_id)`, else by email (and link), else
    /// create with a random opaque password hash the user can never type.
    pub async fn find_or_create_federated_user(
        &self,
        provider: &str,
        provider_account_id: &str,
        email: &str,
        email_verified: bool,
    ) -> Result<User> {
        let email = Self::normalize_email(email);

        if let Some(user) = self
            .store
            .find_user_by_federated_account(provider, provider_account_id)
            .await?
        {
            return Ok(user);
        }

        if let Some(mut user) = self.store.find_user_by_email(&email).await? {
            user.federated_provider = Some(provider.to_string());
            user.federated_account_id = Some(provider_account_id.to_string());
            user.updated_at = Utc::now();
            return Ok(self.store.update_user(user).await?);
        }

        let opaque_password_hash =
            Kdf::argon2_hash(random::opaque_token().as_bytes(), &Argon2Params::default())?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            password_hash: opaque_password_hash,
            email_verified,
            is_admin: false,
            federated_provider: Some(provider.to_string()),
            federated_account_id: Some(provider_account_id.to_string()),
            created_at: now,
            updated_at: now,
        };
        Ok(self.store.create_user(user).await?)
    }

    /// Enumeration-safe by construction: callers must always respond 200
    /// regardless of the returned value, including `Ok(())` for an unknown
    /// email (no token is minted, no error distinguishes the two cases).
    pub async fn request_magic_link(
        &self,
        email: &str,
        token_type: MagicLinkTokenType,
    ) -> Result<Option<(Uuid, String)>> {
        let email = Self::normalize_email(email);

        // CSPRNG + scrypt run unconditionally, before the existence check, so
        // an unknown email costs the same tens-of-milliseconds as a known one
        // instead of short-circuiting straight to a cheap response.
        let raw_token = random::opaque_token();
        let token_hash = token_hash::hash_token(&raw_token)?;

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        let record = MagicLinkToken {
            id: Uuid::new_v4(),
            user_id: user.id,
            token_hash,
            token_type,
            expires_at: now + magic_link_ttl(token_type),
            used: false,
            created_at: now,
        };
        self.store.create_magic_link_token(record).await?;
        Ok(Some((user.id, raw_token)))
    }

    /// Iterates unused, unexpired tokens of the requested type and
    /// timing-safe compares each stored hash; first match wins (§4.8).
    pub async fn consume_magic_link(
        &self,
        user_id: Uuid,
        token_type: MagicLinkTokenType,
        presented_token: &str,
    ) -> Result<()> {
        let candidates = self
            .store
            .list_unused_magic_link_tokens_by_type(user_id, token_type)
            .await?;

        let now = Utc::now();
        for candidate in candidates {
            if candidate.is_expired(now) {
                continue;
            }
            if token_hash::verify_token(presented_token, &candidate.token_hash)? {
                self.store.mark_magic_link_token_used(candidate.id).await?;
                return Ok(());
            }
        }
        Err(IdentityError::InvalidToken)
    }

    pub async fn verify_email(&self, user_id: Uuid, presented_token: &str) -> Result<()> {
        self.consume_magic_link(user_id, MagicLinkTokenType::EmailVerification, presented_token)
            .await?;

        let mut user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)?;
        user.email_verified = true;
        user.updated_at = Utc::now();
        self.store.update_user(user).await?;
        Ok(())
    }

    /// Password-reset success per §4.8: hash the new password, invalidate
    /// every outstanding password-reset token, and sign the user out
    /// everywhere.
    pub async fn reset_password(
        &self,
        user_id: Uuid,
        presented_token: &str,
        new_password: &str,
    ) -> Result<()> {
        self.consume_magic_link(user_id, MagicLinkTokenType::PasswordReset, presented_token)
            .await?;

        if !PasswordStrength::is_strong(new_password) {
            return Err(IdentityError::WeakPassword);
        }

        let mut user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)?;
        user.password_hash = Kdf::argon2_hash(new_password.as_bytes(), &Argon2Params::default())?;
        user.updated_at = Utc::now();
        self.store.update_user(user).await?;

        self.store
            .invalidate_user_magic_link_tokens(user_id, MagicLinkTokenType::PasswordReset)
            .await?;
        self.store.delete_sessions_by_user(user_id).await?;
        Ok(())
    }

    /// Wire form `koa_<prefix>_<secret>`, per §6 Wire formats. Only the
    /// prefix and a scrypt hash of the secret persist.
    pub async fn create_api_key(&self, user_id: Uuid, name: &str) -> Result<IssuedApiKey> {
        let existing = self.store.list_api_keys_by_user(user_id).await?;
        if existing.len() >= MAX_ACTIVE_API_KEYS {
            return Err(IdentityError::ApiKeyLimitReached);
        }

        let prefix = format!("{API_KEY_PREFIX_NAMESPACE}_{}", random::api_key_prefix());
        let secret = random::opaque_token();
        let raw_key = format!("{prefix}_{secret}");
        let key_hash = token_hash::hash_token(&secret)?;

        let record = UserApiKey {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            prefix: prefix.clone(),
            key_hash,
            expires_at: None,
            last_used_at: None,
            created_at: Utc::now(),
        };
        let record = self.store.create_api_key(record).await?;
        Ok(IssuedApiKey { raw_key, record })
    }

    pub async fn list_api_keys(&self, user_id: Uuid) -> Result<Vec<UserApiKey>> {
        Ok(self.store.list_api_keys_by_user(user_id).await?)
    }

    pub async fn revoke_api_key(&self, id: Uuid) -> Result<()> {
        self.store.delete_api_key(id).await?;
        Ok(())
    }

    /// Validates a presented `koa_<prefix>_<secret>` bearer value against the
    /// store (§4.5): parse the prefix, look it up, scrypt-verify the
    /// secret, reject if expired, and record last-used on success.
    ///
    /// The prefix is fixed-width (`koa_` + 6 base64url characters), so it's
    /// sliced out by position rather than split on `_` — the secret itself
    /// is base64url and may legitimately contain underscores.
    pub async fn authenticate_api_key(&self, presented: &str) -> Result<UserApiKey> {
        let prefix_len = API_KEY_PREFIX_NAMESPACE.len() + 1 + API_KEY_RANDOM_PREFIX_LEN;
        if presented.len() <= prefix_len + 1
            || !presented.starts_with(API_KEY_PREFIX_NAMESPACE)
            || presented.as_bytes()[prefix_len] != b'_'
        {
            return Err(IdentityError::InvalidToken);
        }
        let prefix = &presented[..prefix_len];
        let secret = &presented[prefix_len + 1..];

        let key = self
            .store
            .find_api_key_by_prefix(prefix)
            .await?
            .ok_or(IdentityError::InvalidToken)?;

        if key.is_expired(Utc::now()) {
            return Err(IdentityError::TokenExpired);
        }
        if !token_hash::verify_token(secret, &key.key_hash)? {
            return Err(IdentityError::InvalidToken);
        }

        self.store.touch_api_key_last_used(key.id).await?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryStore;

    fn service() -> AccountService {
        AccountService::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn rejects_duplicate_signup() {
        let svc = service();
        svc.register("A@B.c", "Str0ng!pass").await.unwrap();
        let err = svc.register("a@b.c", "Str0ng!pass").await.unwrap_err();
        assert!(matches!(err, IdentityError::EmailAlreadyInUse));
    }

    #[tokio::test]
    async fn login_fails_generically_for_unknown_and_wrong_password() {
        let svc = service();
        svc.register("a@b.c", "Str0ng!pass").await.unwrap();

        let unknown = svc.authenticate_password("x@y.z", "whatever1!").await;
        let wrong = svc.authenticate_password("a@b.c", "wrongpass1!").await;
        assert!(matches!(unknown, Err(IdentityError::InvalidCredentials)));
        assert!(matches!(wrong, Err(IdentityError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn magic_link_round_trips_and_is_single_use() {
        let svc = service();
        let user = svc.register("a@b.c", "Str0ng!pass").await.unwrap();

        let (_, token) = svc
            .request_magic_link("a@b.c", MagicLinkTokenType::EmailVerification)
            .await
            .unwrap()
            .unwrap();

        svc.verify_email(user.id, &token).await.unwrap();
        let reused = svc
            .consume_magic_link(user.id, MagicLinkTokenType::EmailVerification, &token)
            .await;
        assert!(matches!(reused, Err(IdentityError::InvalidToken)));
    }

    #[tokio::test]
    async fn api_key_lifecycle() {
        let svc = service();
        let user = svc.register("a@b.c", "Str0ng!pass").await.unwrap();

        let issued = svc.create_api_key(user.id, "ci").await.unwrap();
        assert!(issued.raw_key.starts_with("koa_"));

        let authenticated = svc.authenticate_api_key(&issued.raw_key).await.unwrap();
        assert_eq!(authenticated.user_id, user.id);

        svc.revoke_api_key(issued.record.id).await.unwrap();
        let after_revoke = svc.authenticate_api_key(&issued.raw_key).await;
        assert!(matches!(after_revoke, Err(IdentityError::InvalidToken)));
    }
}
