use std::sync::Arc;

use chrono::Utc;
use crypto::RsaKeyManager;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::config::IdentityConfig;
use crate::error::{IdentityError, Result};
use crate::models::{AccessTokenClaims, IdTokenClaims, IssuedAccessToken};

/// Mints and verifies the JWT-shaped artifacts named in spec §4.4: access
/// tokens and ID tokens. Opaque artifacts (session refresh tokens,
/// magic-link tokens, raw API keys) are handled by `SessionService` and
/// `AccountService` instead, since they never need a JWT encoder.
pub struct TokenService {
    keys: Arc<RsaKeyManager>,
    config: IdentityConfig,
}

impl TokenService {
    pub fn new(keys: Arc<RsaKeyManager>, config: IdentityConfig) -> Self {
        Self { keys, config }
    }

    pub fn kid(&self) -> &str {
        self.keys.kid()
    }

    /// Issues an access token. `client_id`/`scope` are present for OAuth
    /// issuance and absent for the password-based `/api/auth/*` flows.
    pub fn issue_access_token(
        &self,
        user_id: &str,
        email: Option<&str>,
        client_id: Option<&str>,
        scope: Option<&str>,
    ) -> Result<IssuedAccessToken> {
        let now = Utc::now();
        let ttl = self.config.access_token_ttl.as_secs() as i64;
        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ttl,
            client_id: client_id.map(str::to_string),
            scope: scope.map(str::to_string),
        };
        let token = self.sign(&claims)?;
        Ok(IssuedAccessToken {
            token,
            expires_in: ttl,
        })
    }

    /// Issues an OIDC ID token for the `openid` scope. `auth_time` is the
    /// session's or authorization code's creation time, per §4.4.
    pub fn issue_id_token(
        &self,
        user_id: &str,
        client_id: &str,
        email: Option<&str>,
        email_verified: Option<bool>,
        nonce: Option<&str>,
        auth_time: chrono::DateTime<Utc>,
    ) -> Result<String> {
        let now = Utc::now();
        let ttl = self.config.id_token_ttl.as_secs() as i64;
        let claims = IdTokenClaims {
            sub: user_id.to_string(),
            iss: self.config.jwt_issuer.clone(),
            aud: client_id.to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + ttl,
            auth_time: auth_time.timestamp(),
            nonce: nonce.map(str::to_string),
            email: email.map(str::to_string),
            email_verified,
        };
        self.sign(&claims)
    }

    /// Verifies an access token per §4.4's verification rules: signature,
    /// expiry, issuer, audience intersection, alg pinned to RS256.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessTokenClaims> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.config.jwt_issuer.clone()]);
        validation.set_audience(&self.config.jwt_audience);
        let pem = self.keys.public_key_pem().map_err(IdentityError::Crypto)?;
        let key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(IdentityError::Jwt)?;
        let data = decode::<AccessTokenClaims>(token, &key, &validation).map_err(IdentityError::Jwt)?;
        Ok(data.claims)
    }

    fn sign<T: serde::Serialize>(&self, claims: &T) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.keys.kid().to_string());
        let pem = self.keys.private_key_pem().map_err(IdentityError::Crypto)?;
        let key = EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(IdentityError::Jwt)?;
        encode(&header, claims, &key).map_err(IdentityError::Jwt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

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

    fn service() -> TokenService {
        let keys = Arc::new(RsaKeyManager::load(None, None).unwrap());
        TokenService::new(keys, config())
    }

    #[test]
    fn access_token_round_trips_through_verification() {
        let svc = service();
        let issued = svc
            .issue_access_token("user-123", Some("a@b.c"), Some("client_xyz"), Some("openid email"))
            .unwrap();

        let claims = svc.verify_access_token(&issued.token).unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.client_id.as_deref(), Some("client_xyz"));
        assert_eq!(issued.expires_in, 900);
    }

    #[test]
    fn verification_rejects_a_token_from_a_different_key() {
        let svc = service();
        let other = service();
        let issued = svc.issue_access_token("user-123", None, None, None).unwrap();
        assert!(other.verify_access_token(&issued.token).is_err());
    }

    #[test]
    fn id_token_carries_oidc_claims() {
        let svc = service();
        let now = Utc::now();
        let token = svc
            .issue_id_token("user-123", "client_xyz", Some("a@b.c"), Some(true), None, now)
            .unwrap();
        assert!(!token.is_empty());
    }
}
