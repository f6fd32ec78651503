use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub redaction_enabled: bool,
    /// `"json"` in production, `"pretty"` for local development.
    pub format: String,
    pub log_level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            redaction_enabled: true,
            format: "pretty".to_string(),
            log_level: "info".to_string(),
        }
    }
}
