mod config;
mod dashboard;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use studio_core::prompts::PLATFORM_NAME;
use studio_engine::EngineConfig;
use studio_logging::{studio_error, studio_info, LogDestination};
use tokio::net::TcpListener;

use config::ServerConfig;
use dashboard::Dashboard;
use routes::{build_router, AppContext};

#[tokio::main]
async fn main() -> Result<()> {
    let level = studio_logging::level_from_name(std::env::var("LOG_LEVEL").ok().as_deref());
    let destination = match std::env::var("LOG_FILE") {
        Ok(path) if !path.trim().is_empty() => LogDestination::Both(PathBuf::from(path)),
        _ => LogDestination::Terminal,
    };
    studio_logging::initialize(destination, level);

    let config = ServerConfig::from_env().context("invalid server configuration")?;
    let engine_config = EngineConfig::from_env().context("invalid generative service configuration")?;

    let dashboard = Dashboard::start(&engine_config);
    let context = Arc::new(AppContext::new(dashboard, config.port));
    let app = build_router(context, &config.static_dir);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    studio_info!(
        "{} listening on http://{} (static files from {})",
        PLATFORM_NAME,
        listener.local_addr()?,
        config.static_dir.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    studio_info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        studio_error!("cannot listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    studio_info!("shutting down");
}
