use anyhow::Result;
use clap::Parser;
use pushsync::config::AppConfig;
use pushsync::engine::SyncEngine;
use pushsync::http::app_server::AppServer;
use pushsync::telemetry;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "pushsync-server", about = "Blob folder to push dataset sync server")]
struct Cli {
    /// Path to config file; PUSHSYNC_* environment variables override it
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let now = Instant::now();

    telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    let cli = Cli::parse();

    tracing::info!("Starting pushsync server");

    let config = AppConfig::load(cli.config.as_deref())?;
    config.validate()?;

    match &cli.config {
        Some(path) => tracing::info!("Configuration '{}' loaded successfully", path),
        None => tracing::info!("Configuration loaded from environment"),
    }

    let engine = SyncEngine::from_config(&config)?;

    tracing::info!("Engine initialized");

    let app = AppServer::new(engine);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server started in {}ms", now.elapsed().as_millis());
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown())
        .await?;

    tracing::info!("Server shutdown complete");
    telemetry::shutdown_telemetry();

    Ok(())
}

async fn shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server...");
}
