//! Structured logging with automatic secret redaction.
//!
//! The authorization server's logs routinely flow past values that must never
//! reach a log sink in cleartext: passwords, refresh tokens, magic-link
//! tokens, API keys, and OAuth client secrets. [`Redactor`] strips those
//! before a message is recorded; [`init`] wires `tracing-subscriber` up with
//! an env-filter and a JSON or compact formatter depending on environment.

pub mod config;
pub mod macros;
pub mod redactor;
pub mod subscriber;

pub use config::LoggerConfig;
pub use redactor::{RedactionConfig, Redactor};
pub use subscriber::init;
