//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API on its own, with OpenAPI/Swagger UI. Useful during development when the
//! workspace's `bannershare-run` binary is not wanted.

use bannershare_core::ServerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the BannerShare REST API server
///
/// Configuration comes from `BANNERSHARE_*` environment variables (optionally via `.env`).
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - configuration values are invalid or storage cannot be opened,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_lookup(|name| std::env::var(name).ok())?;
    tracing::info!("-- Starting BannerShare REST API on {}", config.addr());

    let state = api_rest::state_from_config(&config).await?;
    let app = api_rest::router(state);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
