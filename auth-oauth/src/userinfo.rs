use std::sync::Arc;

use auth_identity::AccessTokenClaims;
use store::Store;
use uuid::Uuid;

use crate::error::{OAuthError, Result};
use crate::models::UserInfoResponse;

/// `GET /oauth/userinfo` (§4.7.4): Bearer-protected, JWT-only (the
/// Authenticator restricts this route to `authenticate_jwt_only`), response
/// filtered by the token's granted scopes.
pub struct UserInfoEndpoint {
    store: Arc<dyn Store>,
}

impl UserInfoEndpoint {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn userinfo(&self, claims: &AccessTokenClaims) -> Result<UserInfoResponse> {
        let scopes: Vec<&str> = claims.scope.as_deref().unwrap_or_default().split_whitespace().collect();
        if !scopes.contains(&"openid") {
            return Err(OAuthError::InvalidToken);
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| OAuthError::InvalidToken)?;
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(OAuthError::InvalidToken)?;

        let include_email = scopes.contains(&"email") || scopes.contains(&"profile");

        Ok(UserInfoResponse {
            sub: user.id.to_string(),
            email: include_email.then_some(user.email),
            email_verified: include_email.then_some(user.email_verified),
        })
    }
}
