//! authgate API Server
//!
//! REST API server for signup, login, token refresh and user lookup.

use anyhow::Context;
use authgate_api::{create_router, state::AppState};
use authgate_core::{AppConfig, InMemoryUserStore, LoggingConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match std::env::var("AUTHGATE_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {path}"))?
            .with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };

    init_tracing(&config.logging);

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state; a missing signing secret stops here
    let state = match AppState::new(config, Arc::new(InMemoryUserStore::new())) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!(error = %e, "refusing to start");
            return Err(e.into());
        }
    };

    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("authgate API Server starting on http://{}", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "authgate_api={level},authgate_core={level},audit=info,tower_http=debug",
            level = logging.level
        )
        .into()
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
