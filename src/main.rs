//! GSE Checkout Server
//!
//! Equipment checkout and reservation REST API server.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use gse_checkout_server::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::Repository,
    services::{clock::SystemClock, gateway, scanner::QrDecoder, settings::SettingsService, Services},
    AppState,
};

/// Install the tracing subscriber. The returned guard must outlive the
/// program for file logs to be flushed.
fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("gse_checkout_server={},tower_http=debug", config.level).into());

    let stdout = if config.format == "json" {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let (file, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "gse-checkout.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(file)
        .init();

    guard
}

async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
    token.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting GSE Checkout Server v{}", env!("CARGO_PKG_VERSION"));

    let repository = Repository::from_config(&config).context("Failed to create fleet source")?;
    tracing::info!("Fleet source: {:?}", config.source.kind);

    let gateway = gateway::from_config(&config.gateway).context("Failed to create gateway")?;
    tracing::info!("Submission gateway: {:?}", config.gateway.kind);

    let settings = SettingsService::load(&config.settings.path).context("Failed to load settings")?;

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid host address")?,
        config.server.port,
    );

    let config = Arc::new(config);
    let services = Services::new(
        config.clone(),
        repository,
        gateway,
        Arc::new(QrDecoder),
        settings,
        Arc::new(SystemClock),
    )
    .context("Failed to create services")?;

    let state = AppState {
        config,
        services: Arc::new(services),
    };

    let shutdown = CancellationToken::new();
    let sweeper = state.services.checkout.spawn_sweeper(shutdown.clone());

    let app = api::create_router(state.clone());

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!("Session sweeper ended abnormally: {}", e);
    }
    state.services.checkout.shutdown().await;
    if let Err(e) = state.services.settings.save().await {
        tracing::error!("Failed to save settings: {}", e);
    }

    tracing::info!("Server stopped");
    Ok(())
}
