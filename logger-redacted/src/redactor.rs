use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
    // Bearer tokens, JWTs (three dot-separated base64url segments), and our
    // own opaque tokens/hashes, which are all long base64url-ish runs.
    static ref TOKEN_REGEX: Regex =
        Regex::new(r"\b[A-Za-z0-9_-]{24,}(?:\.[A-Za-z0-9_-]{4,}){0,2}\b").unwrap();
}

/// Which categories of value get redacted before a log line is emitted.
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_tokens: bool,
    pub hash_for_correlation: bool,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_tokens: true,
            hash_for_correlation: true,
        }
    }
}

/// Redacts secrets out of a log message, optionally leaving a short hash
/// behind so repeated occurrences of the same secret can still be correlated.
pub struct Redactor {
    config: RedactionConfig,
}

impl Redactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }
        if self.config.redact_tokens {
            result = self.redact_tokens(&result);
        }

        result
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let email = &caps[0];
                if self.config.hash_for_correlation {
                    format!("EMAIL[{}]", self.hash_value(email))
                } else {
                    let parts: Vec<&str> = email.split('@').collect();
                    match parts.as_slice() {
                        [local, domain] => format!(
                            "{}***@{}***",
                            &local[..1.min(local.len())],
                            &domain[..1.min(domain.len())]
                        ),
                        _ => "***@***".to_string(),
                    }
                }
            })
            .to_string()
    }

    fn redact_tokens(&self, text: &str) -> String {
        TOKEN_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let token = &caps[0];
                if self.config.hash_for_correlation {
                    format!("TOKEN[{}]", self.hash_value(token))
                } else {
                    "***REDACTED***".to_string()
                }
            })
            .to_string()
    }

    fn hash_value(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        let result = hasher.finalize();
        general_purpose::URL_SAFE_NO_PAD.encode(&result[..8])
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(RedactionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_email_without_hashing() {
        let redactor = Redactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        });
        let redacted = redactor.redact("login attempt for john.doe@example.com");
        assert!(redacted.contains("j***@e***"));
        assert!(!redacted.contains("john.doe"));
    }

    #[test]
    fn redacts_bearer_token() {
        let redactor = Redactor::default();
        let token = "a".repeat(40);
        let redacted = redactor.redact(&format!("Authorization: Bearer {token}"));
        assert!(!redacted.contains(&token));
        assert!(redacted.contains("TOKEN["));
    }

    #[test]
    fn same_secret_hashes_identically() {
        let redactor = Redactor::default();
        let token = "b".repeat(32);
        let first = redactor.redact(&token);
        let second = redactor.redact(&token);
        assert_eq!(first, second);
    }

    #[test]
    fn leaves_short_identifiers_alone() {
        let redactor = Redactor::default();
        let redacted = redactor.redact("client_id=abc123");
        assert_eq!(redacted, "client_id=abc123");
    }
}
