use bannershare_core::ServerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the BannerShare application
///
/// Serves the REST API, the signed write endpoint and the review pages from one listener.
///
/// # Environment Variables
/// - `BANNERSHARE_ADDR`: listen address (default: "0.0.0.0:3000")
/// - `BANNERSHARE_PUBLIC_URL`: origin used in review links and signed URLs
///   (default: "http://localhost:3000")
/// - `BANNERSHARE_STORAGE`: `filesystem` or `memory` (default: "filesystem")
/// - `BANNERSHARE_DATA_DIR`: root directory for the filesystem backend
/// - `BANNERSHARE_MAX_FILE_SIZE` / `BANNERSHARE_MAX_TOTAL_SIZE`: limits in bytes
/// - `BANNERSHARE_SIGNED_URL_TTL_SECS`: lifetime of signed write URLs
/// - `BANNERSHARE_SIGNING_SECRET`: HMAC secret; a random one is generated when unset
///
/// # Returns
/// * `Ok(())` - If the server shuts down cleanly on Ctrl-C
/// * `Err(anyhow::Error)` - If configuration, storage or the listener fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bannershare_run=info".parse()?)
                .add_directive("bannershare_core=info".parse()?)
                .add_directive("bannershare_files=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_lookup(|name| std::env::var(name).ok())?;
    let state = api_rest::state_from_config(&config).await?;
    let app = api_rest::router(state);

    tracing::info!("-- Starting BannerShare on {}", config.addr());
    tracing::info!("-- Review links point at {}", config.public_url());

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- BannerShare stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
}
