use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("federated account already linked to another user")]
    DuplicateFederatedAccount,

    #[error("client_id already registered")]
    DuplicateClientId,

    #[error("generated identifier collided, caller should retry")]
    DuplicateIdentifier,

    #[error("not found")]
    NotFound,

    #[error("backing store error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
