//! PCQ Server - Main entry point

use anyhow::Result;
use pcq_common::logging::{init_logging, LogConfig};
use pcq_server::{api, config::Config, importer, state::AppState};
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::for_binary("pcq-server")
        .with_directives("pcq_server=debug,tower_http=debug")
        .from_env()?;
    let _log_guard = init_logging(&log_config)?;

    info!("Starting PCQ server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.host, config.port
    );

    let state = AppState::new(config.clone());

    // An unreachable queue directory is survivable: enqueue falls through
    // the backup tiers until the path comes back.
    if let Err(err) = state.intake.lock().await.store().probe_writable() {
        tracing::warn!(
            error = %err,
            dir = %config.queue_dir.display(),
            "queue directory not writable at startup"
        );
    }

    match importer::import_pending(&state).await {
        Ok(count) => info!(count, "startup import complete"),
        Err(err) => tracing::error!(error = %err, "startup import failed"),
    }

    let app = api::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("ctrl-c handler installed");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("signal handler installed")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
