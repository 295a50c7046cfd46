// ABOUTME: Guichet server entry point
// ABOUTME: Loads config, bootstraps the database, and serves the HTTP API

use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use guichet_api::{create_router, DbState};
use guichet_notify::TracingDispatcher;
use guichet_storage::StorageConfig;

mod config;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("guichet=info")),
        )
        .init();

    let config = Config::from_env()?;

    let mut storage_config = StorageConfig::default();
    if let Some(path) = &config.database_path {
        storage_config.database_path = path.clone();
    }

    let state = DbState::init(
        &storage_config,
        Arc::new(TracingDispatcher),
        config.fallback_email.clone(),
    )
    .await?;

    let cors = if config.cors_origin == "*" {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(config.cors_origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = create_router(state).layer(cors);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Guichet listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
