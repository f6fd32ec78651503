//! Authentication gateway: turns a request's `Authorization` header and
//! `session_id` cookie into a [`Principal`], per §4.5's precedence order.

pub mod authenticator;
pub mod error;
pub mod extractors;
pub mod principal;

pub use authenticator::Authenticator;
pub use error::GatewayError;
pub use extractors::{AuthenticatedAdmin, JwtPrincipal, OptionalPrincipal};
pub use principal::{Principal, TokenKind};
