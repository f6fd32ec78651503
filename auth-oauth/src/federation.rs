use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope, TokenUrl,
};

use crate::error::{OAuthError, Result};
use crate::models::{ExternalProvider, FederatedProfile, GitHubEmail, GitHubUser, GoogleUserInfo};

/// Drives the outbound half of federated login (§4.8): redirect to the
/// provider, then on callback exchange the provider's authorization code
/// for an access token and fetch a normalized profile. The resulting
/// `FederatedProfile` is handed to
/// `auth_identity::AccountService::find_or_create_federated_user`.
pub struct FederatedClient {
    provider: ExternalProvider,
    http: reqwest::Client,
}

impl FederatedClient {
    pub fn new(provider: ExternalProvider) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("reqwest client builds with static config");
        Self { provider, http }
    }

    fn oauth_client(&self) -> Result<BasicClient> {
        let client = BasicClient::new(
            ClientId::new(self.provider.client_id.clone()),
            Some(ClientSecret::new(self.provider.client_secret.clone())),
            AuthUrl::new(self.provider.authorize_url.clone())
                .map_err(|e| OAuthError::ExternalProviderError(e.to_string()))?,
            Some(
                TokenUrl::new(self.provider.token_url.clone())
                    .map_err(|e| OAuthError::ExternalProviderError(e.to_string()))?,
            ),
        )
        .set_redirect_uri(
            RedirectUrl::new(self.provider.redirect_uri.clone())
                .map_err(|e| OAuthError::ExternalProviderError(e.to_string()))?,
        );
        Ok(client)
    }

    /// Builds the redirect target for `GET /api/auth/<provider>` plus the
    /// CSRF token the caller must stash (session-bound) and compare on
    /// callback.
    pub fn authorization_url(&self) -> Result<(String, CsrfToken)> {
        let client = self.oauth_client()?;
        let mut request = client.authorize_url(CsrfToken::new_random);
        for scope in &self.provider.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        let (url, csrf) = request.url();
        Ok((url.to_string(), csrf))
    }

    /// `GET /api/auth/<provider>/callback`: exchange the authorization code
    /// and fetch a normalized profile.
    pub async fn exchange_and_fetch_profile(&self, code: &str) -> Result<FederatedProfile> {
        let client = self.oauth_client()?;
        let token = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| OAuthError::ExternalProviderError(e.to_string()))?;

        let access_token = oauth2::TokenResponse::access_token(&token).secret().clone();

        match self.provider.name {
            "google" => self.fetch_google_profile(&access_token).await,
            "github" => self.fetch_github_profile(&access_token).await,
            other => Err(OAuthError::ExternalProviderError(format!(
                "no profile fetcher for provider {other}"
            ))),
        }
    }

    async fn fetch_google_profile(&self, access_token: &str) -> Result<FederatedProfile> {
        let profile: GoogleUserInfo = self
            .http
            .get(&self.provider.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?
            .json()
            .await?;

        Ok(FederatedProfile {
            provider_account_id: profile.sub,
            email: profile.email,
            email_verified: profile.email_verified,
        })
    }

    /// GitHub's `/user` endpoint omits `email` unless the user made it
    /// public, so the primary verified address is fetched separately from
    /// `/user/emails` when needed.
    async fn fetch_github_profile(&self, access_token: &str) -> Result<FederatedProfile> {
        let user: GitHubUser = self
            .http
            .get(&self.provider.userinfo_url)
            .bearer_auth(access_token)
            .header("User-Agent", "koauth")
            .send()
            .await?
            .json()
            .await?;

        if let Some(email) = user.email {
            return Ok(FederatedProfile {
                provider_account_id: user.id.to_string(),
                email,
                email_verified: true,
            });
        }

        let emails: Vec<GitHubEmail> = self
            .http
            .get("https://api.github.com/user/emails")
            .bearer_auth(access_token)
            .header("User-Agent", "koauth")
            .send()
            .await?
            .json()
            .await?;

        let primary = emails
            .into_iter()
            .find(|e| e.primary && e.verified)
            .ok_or_else(|| OAuthError::ExternalProviderError("no verified primary email".to_string()))?;

        Ok(FederatedProfile {
            provider_account_id: user.id.to_string(),
            email: primary.email,
            email_verified: true,
        })
    }
}
