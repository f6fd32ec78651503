use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AuthorizationCode, MagicLinkToken, MagicLinkTokenType, OAuthClient, OAuthRefreshToken,
    Session, User, UserApiKey,
};

/// Persistence for every entity in the data model, plus the invariants that
/// must hold regardless of backend: unique case-folded email, unique
/// `(provider, provider_account_id)`, unique `client_id`, unique
/// authorization-code/refresh-token/API-key-prefix strings, and atomic
/// single-success claiming of authorization codes.
#[async_trait]
pub trait Store: Send + Sync {
    // --- users ---
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_federated_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<User>>;
    async fn create_user(&self, user: User) -> Result<User>;
    async fn update_user(&self, user: User) -> Result<User>;
    async fn delete_user(&self, id: Uuid) -> Result<()>;

    // --- sessions ---
    async fn create_session(&self, session: Session) -> Result<Session>;
    async fn find_session(&self, id: &str) -> Result<Option<Session>>;
    async fn delete_session(&self, id: &str) -> Result<()>;
    async fn delete_sessions_by_user(&self, user_id: Uuid) -> Result<()>;

    // --- oauth clients ---
    async fn create_client(&self, client: OAuthClient) -> Result<OAuthClient>;
    async fn find_client(&self, client_id: &str) -> Result<Option<OAuthClient>>;
    async fn update_client(&self, client: OAuthClient) -> Result<OAuthClient>;
    async fn delete_client(&self, client_id: &str) -> Result<()>;

    // --- authorization codes ---
    async fn create_authorization_code(&self, code: AuthorizationCode) -> Result<AuthorizationCode>;

    /// Atomically returns the code record only if it exists, is unused, and
    /// unexpired — and marks it used in the same operation. A second caller
    /// racing on the same code value MUST see `Ok(None)` or `NotFound`, never
    /// a second copy of the record (spec §4.3 invariant 5, §5 concurrency
    /// model, property P4).
    async fn consume_authorization_code(&self, code: &str) -> Result<Option<AuthorizationCode>>;

    /// Looks a code up by value regardless of its `used`/expiry state, so a
    /// second exchange attempt on an already-consumed code can still learn
    /// which client/user it belonged to (§4.7.3 step 2's code-replay
    /// protection: a reused code revokes every refresh token issued under
    /// it, which `consume_authorization_code` alone can't support since it
    /// returns `None` for an already-used code).
    async fn find_authorization_code_by_code(&self, code: &str) -> Result<Option<AuthorizationCode>>;

    // --- oauth refresh tokens ---
    async fn create_refresh_token(&self, token: OAuthRefreshToken) -> Result<OAuthRefreshToken>;

    /// Looks a refresh-token record up by its non-secret lookup id (the
    /// `OAuthRefreshToken.id` embedded in the opaque value handed to the
    /// client as `"<id>.<secret>"`) — scrypt hashes can't be indexed
    /// directly since each is salted, so the caller verifies the secret
    /// half against `token_hash` with a timing-safe compare after this
    /// lookup returns the candidate record.
    async fn find_refresh_token_by_id(&self, id: Uuid) -> Result<Option<OAuthRefreshToken>>;
    async fn revoke_refresh_token(&self, id: Uuid) -> Result<()>;
    async fn revoke_refresh_token_family(&self, family_id: Uuid) -> Result<()>;

    /// Revokes every refresh token issued to `user_id` under `client_id`,
    /// regardless of family — the code-replay response of §4.7.3 step 2.
    async fn revoke_refresh_tokens_for_client_user(
        &self,
        client_id: &str,
        user_id: Uuid,
    ) -> Result<()>;

    // --- personal api keys ---
    async fn create_api_key(&self, key: UserApiKey) -> Result<UserApiKey>;
    async fn find_api_key_by_prefix(&self, prefix: &str) -> Result<Option<UserApiKey>>;
    async fn list_api_keys_by_user(&self, user_id: Uuid) -> Result<Vec<UserApiKey>>;
    async fn delete_api_key(&self, id: Uuid) -> Result<()>;
    async fn touch_api_key_last_used(&self, id: Uuid) -> Result<()>;

    // --- magic-link tokens ---
    async fn create_magic_link_token(&self, token: MagicLinkToken) -> Result<MagicLinkToken>;
    async fn list_unused_magic_link_tokens_by_type(
        &self,
        user_id: Uuid,
        token_type: MagicLinkTokenType,
    ) -> Result<Vec<MagicLinkToken>>;
    async fn mark_magic_link_token_used(&self, id: Uuid) -> Result<()>;
    async fn invalidate_user_magic_link_tokens(
        &self,
        user_id: Uuid,
        token_type: MagicLinkTokenType,
    ) -> Result<()>;
}
