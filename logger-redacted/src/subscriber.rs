use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggerConfig;

/// Installs the global `tracing` subscriber. Call once, at process start.
///
/// Log level is controlled by `RUST_LOG` when set, falling back to
/// `config.log_level`. `config.format == "json"` switches to structured JSON
/// output, which is what production deployments should use so log lines are
/// machine-parseable; local development defaults to a compact human-readable
/// formatter.
pub fn init(config: &LoggerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry.with(fmt::layer().json().with_current_span(true)).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}
