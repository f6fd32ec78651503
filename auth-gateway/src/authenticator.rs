use std::sync::Arc;

use auth_identity::{AccountService, SessionService, TokenService};
use store::Store;
use uuid::Uuid;

use crate::error::GatewayError;
use crate::principal::{Principal, TokenKind};

/// Implements §4.5's precedence order: Bearer JWT, then Bearer API key,
/// then session cookie — a Bearer header present but unverifiable rejects
/// outright rather than falling through to the cookie.
pub struct Authenticator {
    tokens: Arc<TokenService>,
    accounts: Arc<AccountService>,
    sessions: Arc<SessionService>,
    store: Arc<dyn Store>,
}

impl Authenticator {
    pub fn new(
        tokens: Arc<TokenService>,
        accounts: Arc<AccountService>,
        sessions: Arc<SessionService>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            tokens,
            accounts,
            sessions,
            store,
        }
    }

    pub async fn authenticate(
        &self,
        bearer: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<Principal, GatewayError> {
        if let Some(token) = bearer {
            return self.authenticate_bearer(token).await;
        }

        if let Some(session_id) = session_id {
            return self.authenticate_session(session_id).await;
        }

        Err(GatewayError::Unauthorized)
    }

    pub async fn authenticate_optional(
        &self,
        bearer: Option<&str>,
        session_id: Option<&str>,
    ) -> Principal {
        self.authenticate(bearer, session_id)
            .await
            .unwrap_or(Principal::None)
    }

    /// Restricted to JWT access tokens only (§4.7.4 UserInfo).
    pub async fn authenticate_jwt_only(&self, bearer: &str) -> Result<Principal, GatewayError> {
        match self.tokens.verify_access_token(bearer) {
            Ok(claims) => self.principal_from_claims(claims),
            Err(_) => Err(GatewayError::Unauthorized),
        }
    }

    pub async fn require_admin(&self, principal: &Principal) -> Result<(), GatewayError> {
        let user_id = principal.user_id().ok_or(GatewayError::Unauthorized)?;
        let user = self
            .store
            .find_user_by_id(user_id)
            .await
            .map_err(|_| GatewayError::Unauthorized)?
            .ok_or(GatewayError::Unauthorized)?;

        if user.is_admin {
            Ok(())
        } else {
            Err(GatewayError::Forbidden)
        }
    }

    async fn authenticate_bearer(&self, token: &str) -> Result<Principal, GatewayError> {
        if let Ok(claims) = self.tokens.verify_access_token(token) {
            return self.principal_from_claims(claims);
        }

        if let Ok(key) = self.accounts.authenticate_api_key(token).await {
            let user = self
                .accounts
                .find_user(key.user_id)
                .await
                .map_err(|_| GatewayError::Unauthorized)?;
            return Ok(Principal::Bearer {
                user_id: user.id,
                email: user.email,
                token_kind: TokenKind::ApiKey,
            });
        }

        Err(GatewayError::Unauthorized)
    }

    async fn authenticate_session(&self, session_id: &str) -> Result<Principal, GatewayError> {
        let session = self
            .sessions
            .validate(session_id)
            .await
            .map_err(|_| GatewayError::Unauthorized)?;

        let user = self
            .accounts
            .find_user(session.user_id)
            .await
            .map_err(|_| GatewayError::Unauthorized)?;

        Ok(Principal::Session {
            user_id: user.id,
            email: user.email,
            session_id: session_id.to_string(),
        })
    }

    fn principal_from_claims(
        &self,
        claims: auth_identity::AccessTokenClaims,
    ) -> Result<Principal, GatewayError> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| GatewayError::Unauthorized)?;
        Ok(Principal::Bearer {
            user_id,
            email: claims.email.unwrap_or_default(),
            token_kind: TokenKind::Jwt,
        })
    }
}
