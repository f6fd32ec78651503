use crate::account_service::AccountService;
use crate::error::Result;
use crate::models::{AuthenticatedSession, IssuedAccessToken};
use crate::session_service::SessionService;
use crate::token_service::TokenService;

/// Composes the account, session, and token services into the literal
/// `/api/auth/*` flows of §4.8: signup and login both open a browser
/// session *and* mint an access token; `/api/auth/token` mints only the
/// token.
pub struct AuthFlows {
    pub accounts: AccountService,
    pub sessions: SessionService,
    pub tokens: TokenService,
}

impl AuthFlows {
    pub fn new(accounts: AccountService, sessions: SessionService, tokens: TokenService) -> Self {
        Self {
            accounts,
            sessions,
            tokens,
        }
    }

    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        client_ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<(store::User, AuthenticatedSession)> {
        let user = self.accounts.register(email, password).await?;
        let session = self.open_session(&user, client_ip, user_agent).await?;
        Ok((user, session))
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client_ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<(store::User, AuthenticatedSession)> {
        let user = self.accounts.authenticate_password(email, password).await?;
        let session = self.open_session(&user, client_ip, user_agent).await?;
        Ok((user, session))
    }

    /// `/api/auth/token`: password verification without opening a cookie
    /// session.
    pub async fn token_only(&self, email: &str, password: &str) -> Result<IssuedAccessToken> {
        let user = self.accounts.authenticate_password(email, password).await?;
        self.tokens
            .issue_access_token(&user.id.to_string(), Some(&user.email), None, None)
    }

    pub async fn refresh(
        &self,
        session_id: &str,
        presented_refresh_token: &str,
    ) -> Result<(store::User, crate::models::RotatedSession, IssuedAccessToken)> {
        let rotated = self.sessions.rotate(session_id, presented_refresh_token).await?;
        let session = self.sessions.validate(&rotated.session_id).await?;
        let user = self.accounts.find_user(session.user_id).await?;
        let access_token =
            self.tokens
                .issue_access_token(&user.id.to_string(), Some(&user.email), None, None)?;
        Ok((user, rotated, access_token))
    }

    pub async fn logout(&self, session_id: &str) -> Result<()> {
        self.sessions.revoke(session_id).await
    }

    async fn open_session(
        &self,
        user: &store::User,
        client_ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<AuthenticatedSession> {
        let session = self.sessions.create(user.id, client_ip, user_agent).await?;
        let access_token =
            self.tokens
                .issue_access_token(&user.id.to_string(), Some(&user.email), None, None)?;
        Ok(AuthenticatedSession {
            session_id: session.session_id,
            refresh_token: session.refresh_token,
            session_expires_at: session.expires_at,
            access_token,
        })
    }
}
