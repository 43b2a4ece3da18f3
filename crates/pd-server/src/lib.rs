//! pd-server: HTTP surface and process lifecycle for pixdrop.
//!
//! This crate wires the upload store into a running server:
//!
//! - Axum routes for uploading (`POST /upload`) and retrieving (`GET /i/{id}`)
//! - Request-id tracing spans and JSON error bodies
//! - A cancellable keep-alive task that pings the public URL
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod keepalive;
pub mod middleware;
pub mod router;
pub mod routes;

use std::net::SocketAddr;

use pd_core::config::Config;
use pd_core::Error;
use pd_store::{StoreOptions, UploadStore};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

/// Open the upload store described by `config`.
pub fn open_store(config: &Config) -> pd_core::Result<UploadStore> {
    let store = UploadStore::open(
        &config.storage.upload_dir,
        StoreOptions {
            max_id_attempts: config.storage.max_id_attempts,
        },
    )?;
    tracing::info!(
        "Upload store ready at {} ({} image(s))",
        store.dir().display(),
        store.len()
    );
    Ok(store)
}

/// Start the pixdrop server.
///
/// Opens the store, binds the configured address and serves until a
/// shutdown signal is received.
pub async fn start(config: Config) -> pd_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid server address: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    serve(config, listener, CancellationToken::new()).await
}

/// Serve on an already-bound listener until a shutdown signal arrives or
/// `cancel` is triggered.
///
/// The keep-alive task is tied to the server: it starts once the listener is
/// accepting and is stopped and awaited before this returns.
pub async fn serve(
    config: Config,
    listener: TcpListener,
    cancel: CancellationToken,
) -> pd_core::Result<()> {
    let store = open_store(&config)?;
    let static_dir = config.server.static_dir.clone();
    let keepalive = keepalive::spawn_keepalive(&config, cancel.clone());

    let ctx = AppContext::new(config, store);
    let app = router::build_router(ctx, static_dir);

    tracing::info!("Starting server on {}", listener.local_addr()?);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await;

    // Signal background tasks to stop.
    cancel.cancel();
    if let Some(handle) = keepalive {
        let _ = handle.await;
    }

    result?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
