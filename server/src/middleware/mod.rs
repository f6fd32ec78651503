//! Cross-cutting HTTP concerns: per-request correlation metadata and the
//! in-memory rate limiter.

pub mod rate_limit;
pub mod request_context;

pub use rate_limit::{RateLimiter, RouteClass};
pub use request_context::RequestContext;
