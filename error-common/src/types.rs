use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A taxonomy-tagged error, carried by internal crates when they need to hand
/// the HTTP layer something richer than a bare `thiserror` variant (currently
/// used for error reporting/logging context; domain crates still return their
/// own error enums for the `?` operator to work against).
#[derive(Error, Debug, Serialize, Deserialize)]
pub struct TaggedError {
    pub error_type: ErrorType,
    pub code: ErrorCode,
    pub message: String,
    pub context: HashMap<String, String>,
    pub error_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Set when `message` must not be echoed back to the client verbatim.
    pub is_sensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    Validation,
    Authentication,
    Authorization,
    Database,
    Network,
    BusinessLogic,
    System,
    External,
    Configuration,
    RateLimit,
    NotFound,
    Conflict,
    Timeout,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorType::Validation => "Validation",
            ErrorType::Authentication => "Authentication",
            ErrorType::Authorization => "Authorization",
            ErrorType::Database => "Database",
            ErrorType::Network => "Network",
            ErrorType::BusinessLogic => "BusinessLogic",
            ErrorType::System => "System",
            ErrorType::External => "External",
            ErrorType::Configuration => "Configuration",
            ErrorType::RateLimit => "RateLimit",
            ErrorType::NotFound => "NotFound",
            ErrorType::Conflict => "Conflict",
            ErrorType::Timeout => "Timeout",
        };
        write!(f, "{s}")
    }
}

/// Structured error code: a stable (category, numeric code) pair plus the
/// human-readable text that goes with it, so callers never have to duplicate
/// the description at every call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode {
    pub category: &'static str,
    pub code: u32,
    pub description: &'static str,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:04}", self.category, self.code)
    }
}

impl ErrorCode {
    pub const INVALID_INPUT: ErrorCode = ErrorCode {
        category: "VALIDATION",
        code: 1001,
        description: "The request body or parameters failed validation",
    };
    pub const MISSING_REQUIRED_FIELD: ErrorCode = ErrorCode {
        category: "VALIDATION",
        code: 1002,
        description: "A required field was missing",
    };
    pub const INVALID_CREDENTIALS: ErrorCode = ErrorCode {
        category: "AUTH",
        code: 2001,
        description: "Email or password did not match",
    };
    pub const TOKEN_EXPIRED: ErrorCode = ErrorCode {
        category: "AUTH",
        code: 2002,
        description: "The token presented has expired",
    };
    pub const SESSION_INVALID: ErrorCode = ErrorCode {
        category: "AUTH",
        code: 2003,
        description: "The session is missing, expired, or revoked",
    };
    pub const ACCESS_DENIED: ErrorCode = ErrorCode {
        category: "AUTHZ",
        code: 3001,
        description: "The caller is not permitted to perform this action",
    };
    pub const STORE_ERROR: ErrorCode = ErrorCode {
        category: "STORE",
        code: 4001,
        description: "The backing store returned an unexpected error",
    };
    pub const CONFLICT: ErrorCode = ErrorCode {
        category: "CONFLICT",
        code: 5001,
        description: "The resource already exists or was concurrently modified",
    };
    pub const RATE_LIMITED: ErrorCode = ErrorCode {
        category: "RATE_LIMIT",
        code: 6001,
        description: "Too many requests",
    };
    pub const INTERNAL_ERROR: ErrorCode = ErrorCode {
        category: "SYSTEM",
        code: 9001,
        description: "An unexpected internal error occurred",
    };
}

impl TaggedError {
    pub fn new(error_type: ErrorType, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_type,
            code,
            message: message.into(),
            context: HashMap::new(),
            error_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            is_sensitive: false,
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.is_sensitive = true;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// The message/context safe to send to an external client.
    pub fn public_message(&self) -> &str {
        if self.is_sensitive {
            "An error occurred. Please try again."
        } else {
            &self.message
        }
    }
}

impl fmt::Display for TaggedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} (id={})", self.code, self.message, self.error_id)
    }
}
