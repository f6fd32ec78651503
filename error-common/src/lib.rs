//! Shared error taxonomy for the Koauth workspace.
//!
//! Domain crates (`auth-identity`, `auth-oauth`, `crypto`, ...) define their own
//! `thiserror` error enums; this crate supplies the `ErrorType`/`ErrorCode`
//! vocabulary the HTTP layer (`server`) maps those domain errors onto, plus a
//! small `ErrorContext` helper for attaching request/session/trace ids to a
//! log line without attaching sensitive values.

pub mod context;
pub mod types;

pub use context::*;
pub use types::*;
