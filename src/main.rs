//! Estante Server
//!
//! Authenticated HTTP API exposing metadata and covers of the EPUB files
//! stored in an S3-compatible bucket.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use estante_server::auth::{CachingValidator, GitHubValidator, SystemClock, TokenCache};
use estante_server::config::Config;
use estante_server::routes;
use estante_server::state::AppState;
use estante_server::storage::S3Client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "estante_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("S3_BUCKET must be set")?;

    tracing::info!("Starting Estante Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "S3 endpoint: {}",
        config.storage.endpoint.as_deref().unwrap_or("AWS default")
    );
    tracing::info!("S3 bucket: {}", config.storage.bucket);
    tracing::info!("EPUB cache: {}", config.cache.dir.display());

    let s3_client = S3Client::new(&config.storage)
        .await
        .context("failed to initialize S3 client")?;

    tokio::fs::create_dir_all(&config.cache.dir)
        .await
        .with_context(|| format!("failed to create cache directory {}", config.cache.dir.display()))?;

    let github = GitHubValidator::new(
        config.auth.github_api_url.clone(),
        std::time::Duration::from_secs(config.auth.request_timeout_secs),
    )
    .context("failed to build GitHub client")?;
    let validator = CachingValidator::new(
        Arc::new(github),
        TokenCache::new(
            chrono::Duration::seconds(config.auth.token_ttl_secs as i64),
            Arc::new(SystemClock),
        ),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = routes::router(AppState::new(&config, Arc::new(s3_client), Arc::new(validator)));

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Estante Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
