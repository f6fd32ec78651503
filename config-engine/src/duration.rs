use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Parses a literal like `"15m"`, `"1h"`, or `"30d"` into a [`Duration`].
/// Supports `s` (seconds), `m` (minutes), `h` (hours), and `d` (days) suffixes.
pub fn parse_duration_literal(name: &str, raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let (digits, unit) = raw.split_at(
        raw.find(|c: char| !c.is_ascii_digit())
            .unwrap_or(raw.len()),
    );

    let value: u64 = digits.parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        reason: format!("expected a duration literal like \"15m\", got \"{raw}\""),
    })?;

    let seconds = match unit {
        "s" => value,
        "m" => value * 60,
        "h" => value * 60 * 60,
        "d" => value * 60 * 60 * 24,
        other => {
            return Err(ConfigError::InvalidValue {
                name: name.to_string(),
                reason: format!("unknown duration unit \"{other}\", expected s/m/h/d"),
            })
        }
    };

    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minutes() {
        assert_eq!(
            parse_duration_literal("x", "15m").unwrap(),
            Duration::from_secs(900)
        );
    }

    #[test]
    fn parses_days() {
        assert_eq!(
            parse_duration_literal("x", "30d").unwrap(),
            Duration::from_secs(30 * 86400)
        );
    }

    #[test]
    fn parses_hours_and_seconds() {
        assert_eq!(parse_duration_literal("x", "1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration_literal("x", "45s").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(parse_duration_literal("x", "15w").is_err());
    }

    #[test]
    fn rejects_non_numeric() {
        assert!(parse_duration_literal("x", "soon").is_err());
    }
}
