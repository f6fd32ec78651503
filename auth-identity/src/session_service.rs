use std::sync::Arc;

use chrono::Utc;
use crypto::{random, token_hash};
use store::{Session, Store};
use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::error::{IdentityError, Result};
use crate::models::RotatedSession;

/// Browser-session lifecycle (§4.6): create, validate, rotate with reuse
/// detection, and revoke. Distinct from the OAuth refresh-token subsystem in
/// `auth-oauth`, which tracks its own `family_id` lineage on `store`'s
/// `OAuthRefreshToken` rows.
pub struct SessionService {
    store: Arc<dyn Store>,
    config: IdentityConfig,
}

pub struct NewSession {
    pub session_id: String,
    pub refresh_token: String,
    pub expires_at: chrono::DateTime<Utc>,
}

impl SessionService {
    pub fn new(store: Arc<dyn Store>, config: IdentityConfig) -> Self {
        Self { store, config }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        client_ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<NewSession> {
        let session_id = random::session_id();
        let refresh_token = random::opaque_token();
        let refresh_token_hash = token_hash::hash_token(&refresh_token)?;
        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.config.session_ttl)
                .unwrap_or_else(|_| chrono::Duration::days(7));

        let session = Session {
            id: session_id.clone(),
            user_id,
            refresh_token_hash,
            expires_at,
            client_ip,
            user_agent,
            created_at: Utc::now(),
        };
        self.store.create_session(session).await?;

        Ok(NewSession {
            session_id,
            refresh_token,
            expires_at,
        })
    }

    /// Looks a session up by id, deleting it first if it has already
    /// expired (spec §4.6: "delete-on-expiry").
    pub async fn validate(&self, session_id: &str) -> Result<Session> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or(IdentityError::SessionInvalid)?;

        if session.is_expired(Utc::now()) {
            self.store.delete_session(session_id).await?;
            return Err(IdentityError::SessionInvalid);
        }

        Ok(session)
    }

    /// Rotation with reuse detection. A mismatched refresh token for an
    /// otherwise-valid session id means the presented token was already
    /// rotated out from under its holder — every session belonging to the
    /// user is revoked in response (spec §4.6).
    pub async fn rotate(
        &self,
        session_id: &str,
        presented_refresh_token: &str,
    ) -> Result<RotatedSession> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or(IdentityError::SessionInvalid)?;

        if session.is_expired(Utc::now()) {
            self.store.delete_session(session_id).await?;
            return Err(IdentityError::SessionInvalid);
        }

        if !token_hash::verify_token(presented_refresh_token, &session.refresh_token_hash)? {
            self.store.delete_sessions_by_user(session.user_id).await?;
            return Err(IdentityError::SessionInvalid);
        }

        self.store.delete_session(session_id).await?;
        let fresh = self
            .create(session.user_id, session.client_ip, session.user_agent)
            .await?;

        Ok(RotatedSession {
            session_id: fresh.session_id,
            refresh_token: fresh.refresh_token,
            session_expires_at: fresh.expires_at,
        })
    }

    pub async fn revoke(&self, session_id: &str) -> Result<()> {
        self.store.delete_session(session_id).await?;
        Ok(())
    }

    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<()> {
        self.store.delete_sessions_by_user(user_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;
    use store::InMemoryStore;

    fn config() -> IdentityConfig {
        IdentityConfig {
            jwt_issuer: "https://auth.example".to_string(),
            jwt_audience: vec!["https://api.example".to_string()],
            access_token_ttl: StdDuration::from_secs(900),
            id_token_ttl: IdentityConfig::id_token_default_ttl(),
            oauth_refresh_token_ttl: StdDuration::from_secs(60 * 60 * 24 * 30),
            session_ttl: IdentityConfig::session_default_ttl(),
        }
    }

    fn service() -> SessionService {
        SessionService::new(Arc::new(InMemoryStore::new()), config())
    }

    #[tokio::test]
    async fn rotation_issues_a_fresh_pair_and_invalidates_the_old_session() {
        let svc = service();
        let user_id = Uuid::new_v4();
        let created = svc.create(user_id, None, None).await.unwrap();

        let rotated = svc.rotate(&created.session_id, &created.refresh_token).await.unwrap();
        assert_ne!(rotated.session_id, created.session_id);

        let stale = svc.validate(&created.session_id).await;
        assert!(matches!(stale, Err(IdentityError::SessionInvalid)));
    }

    #[tokio::test]
    async fn reused_refresh_token_revokes_every_session_of_the_user() {
        let svc = service();
        let user_id = Uuid::new_v4();
        let first = svc.create(user_id, None, None).await.unwrap();
        let second = svc.create(user_id, None, None).await.unwrap();

        let reuse = svc.rotate(&first.session_id, "not-the-real-refresh-token").await;
        assert!(matches!(reuse, Err(IdentityError::SessionInvalid)));

        let second_still_valid = svc.validate(&second.session_id).await;
        assert!(matches!(second_still_valid, Err(IdentityError::SessionInvalid)));
    }
}
