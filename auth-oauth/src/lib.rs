//! The OAuth 2.1 / OIDC protocol engine (C7): client registration, the
//! authorize and token endpoints, userinfo, discovery documents, and
//! federated login against external IdPs. Account/session/JWT primitives it
//! builds on live in `auth_identity`; HTTP routing lives in `server`.

pub mod authorize;
pub mod config;
pub mod discovery;
pub mod error;
pub mod federation;
pub mod models;
pub mod registration;
pub mod token;
pub mod userinfo;

pub use authorize::{AuthenticatedUser, AuthorizeEndpoint, AuthorizeOutcome};
pub use config::OAuthEngineConfig;
pub use discovery::DiscoveryEndpoint;
pub use error::{OAuthError, Result};
pub use federation::FederatedClient;
pub use registration::Registrar;
pub use token::TokenEndpoint;
pub use userinfo::UserInfoEndpoint;

use std::sync::Arc;

use auth_identity::TokenService;
use crypto::RsaKeyManager;
use store::Store;

/// Bundles the five C7 endpoints behind the shared state (`Store`, signing
/// keys, config) they all need, so `server` wires one struct instead of
/// five.
pub struct OAuthEngine {
    pub registrar: Registrar,
    pub authorize: AuthorizeEndpoint,
    pub token: TokenEndpoint,
    pub userinfo: UserInfoEndpoint,
    pub discovery: DiscoveryEndpoint,
}

impl OAuthEngine {
    pub fn new(
        store: Arc<dyn Store>,
        keys: Arc<RsaKeyManager>,
        tokens: Arc<TokenService>,
        config: OAuthEngineConfig,
    ) -> Self {
        Self {
            registrar: Registrar::new(store.clone(), config.clone()),
            authorize: AuthorizeEndpoint::new(store.clone(), config.clone()),
            token: TokenEndpoint::new(store.clone(), tokens, config.clone()),
            userinfo: UserInfoEndpoint::new(store),
            discovery: DiscoveryEndpoint::new(keys, config),
        }
    }
}
