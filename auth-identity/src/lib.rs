//! Identity, token, and session services (C4, C6, and the core of C8):
//! signup/login/password management, JWT access/ID-token issuance and
//! verification, browser-session lifecycle, magic-link flows, federated
//! account linking, and personal API keys. The OAuth protocol engine built
//! on top of these lives in `auth-oauth`; HTTP wiring lives in `server`.

pub mod account_service;
pub mod auth_flow;
pub mod config;
pub mod error;
pub mod models;
pub mod session_service;
pub mod token_service;

pub use account_service::AccountService;
pub use auth_flow::AuthFlows;
pub use config::IdentityConfig;
pub use error::{IdentityError, Result};
pub use models::{
    AccessTokenClaims, AuthenticatedSession, IdTokenClaims, IssuedAccessToken, IssuedApiKey,
    RotatedSession,
};
pub use session_service::{NewSession, SessionService};
pub use token_service::TokenService;
