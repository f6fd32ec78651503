//! Process entry point: load configuration, build [`AppState`], bind, and
//! serve. Everything interesting lives in the library crate; this binary is
//! deliberately thin.

use std::net::SocketAddr;

use koauth_server::{create_app, AppState};

#[tokio::main]
async fn main() {
    let config = config_engine::AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("configuration error: {e}");
        std::process::exit(1);
    });

    logger_redacted::init(&logger_redacted::LoggerConfig {
        redaction_enabled: true,
        format: if config.environment == config_engine::Environment::Production {
            "json".to_string()
        } else {
            "pretty".to_string()
        },
        log_level: config.log_level.clone(),
    });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("HOST/PORT form a valid socket address");

    let state = AppState::new(config).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to initialize application state");
        std::process::exit(1);
    });

    let app = create_app(state);

    tracing::info!(%addr, "koauth listening");
    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}
