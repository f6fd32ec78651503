use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type EmailResult<T> = Result<T, EmailError>;
