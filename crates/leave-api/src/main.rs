//! Leave API Server
//!
//! REST API server for the leave manager.
//!
//! Author: hephaex@gmail.com

use leave_api::{create_router, state::AppState};
use leave_core::{config::LoggingConfig, AppConfig, PgStore};
use std::sync::Arc;
use std::time::Duration;

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("leave_api={},tower_http=debug,audit=info", logging.level).into()
    });

    if logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration: a TOML file when LEAVE_CONFIG is set, otherwise env only
    let config = match std::env::var("LEAVE_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    config.validate()?;

    init_tracing(&config.logging);

    let store = Arc::new(PgStore::new(&config.database.url, config.database.pool_size).await?);
    store.migrate().await?;
    tracing::info!("Database migrations applied");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let sweep_every = config.auth.sweep_interval_secs;

    // Create application state
    let state = Arc::new(AppState::new(config, store)?);

    if sweep_every > 0 {
        state
            .sessions
            .refresh_tokens()
            .clone()
            .spawn_sweeper(Duration::from_secs(sweep_every));
    }

    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Leave API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
