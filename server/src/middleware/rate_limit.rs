//! Bounded in-memory rate limiting (§5's table): a sliding-window counter
//! keyed by `(route class, principal-or-IP)`. Single process only — the spec
//! doesn't call for a distributed limiter, and the in-memory store itself
//! is single-process.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// signup/login/token/refresh/federated callbacks: 5 per 15 minutes.
    Auth,
    /// magic-link request endpoints: 5 per hour, keyed by IP regardless of
    /// whether the email is known (enumeration safety extends to the limiter).
    MagicLink,
    /// personal API key create/list/delete: 10 per minute.
    ApiKeyCrud,
    /// generic request-shape validation endpoints: 100 per minute per IP.
    Validation,
    /// everything else: 100 per minute.
    Default,
}

impl RouteClass {
    fn limit(self) -> (usize, Duration) {
        match self {
            RouteClass::Auth => (5, Duration::from_secs(15 * 60)),
            RouteClass::MagicLink => (5, Duration::from_secs(60 * 60)),
            RouteClass::ApiKeyCrud => (10, Duration::from_secs(60)),
            RouteClass::Validation => (100, Duration::from_secs(60)),
            RouteClass::Default => (100, Duration::from_secs(60)),
        }
    }
}

pub struct RateLimiter {
    windows: Mutex<HashMap<(RouteClass, String), VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { windows: Mutex::new(HashMap::new()) }
    }

    /// Records one attempt under `key` (a user id string or an IP address)
    /// and rejects once the class's window is full.
    pub fn check(&self, class: RouteClass, key: &str) -> Result<(), ApiError> {
        let (limit, window) = class.limit();
        let now = Instant::now();

        let mut guard = self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = guard.entry((class, key.to_string())).or_default();

        while let Some(&oldest) = entry.front() {
            if now.duration_since(oldest) > window {
                entry.pop_front();
            } else {
                break;
            }
        }

        if entry.len() >= limit {
            return Err(ApiError::RateLimit(
                "Too many requests, please try again later".to_string(),
            ));
        }
        entry.push_back(now);
        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_under_the_limit_and_rejects_once_full() {
        let limiter = RateLimiter::new();
        for _ in 0..10 {
            limiter.check(RouteClass::ApiKeyCrud, "user-1").unwrap();
        }
        let err = limiter.check(RouteClass::ApiKeyCrud, "user-1").unwrap_err();
        assert!(matches!(err, ApiError::RateLimit(_)));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            limiter.check(RouteClass::Auth, "1.2.3.4").unwrap();
        }
        limiter.check(RouteClass::Auth, "5.6.7.8").unwrap();
    }
}
