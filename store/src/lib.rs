pub mod error;
pub mod memory;
pub mod models;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use models::{
    AuthorizationCode, CodeChallengeMethod, MagicLinkToken, MagicLinkTokenType, OAuthClient,
    OAuthRefreshToken, Session, User, UserApiKey,
};
pub use traits::Store;
