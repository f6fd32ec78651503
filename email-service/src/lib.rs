//! Mailer abstraction consumed by the magic-link subsystem (§4.8):
//! email-verification and password-reset links, sent through Resend.

pub mod error;
pub mod mailer;

pub use error::{EmailError, EmailResult};
pub use mailer::{build_mailer, LoggingMailer, Mailer, ResendMailer};
