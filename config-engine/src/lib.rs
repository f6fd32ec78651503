//! Environment-based configuration loading.
//!
//! A single [`AppConfig`] is built once at process startup from environment
//! variables (with `.env` support for local development) and then handed to
//! every other crate as plain data — no global config singleton, no
//! hot-reload watcher. See spec §6 for the full variable list.

pub mod app;
pub mod duration;
pub mod error;

pub use app::{AppConfig, Environment, KeyMaterial, OAuthProviderConfig};
pub use duration::parse_duration_literal;
pub use error::{ConfigError, Result};
