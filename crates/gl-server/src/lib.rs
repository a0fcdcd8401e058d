//! gl-server: HTTP API for the galleria image gallery.
//!
//! This crate ties the stores from gl-store to an Axum router. It provides:
//!
//! - The upload pipeline (validate, store blob, append record)
//! - The query service (list, get, rename, delete, stream file)
//! - Image API routes under `/api/v1`, OpenAPI docs at `/api-docs`
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod middleware;
pub mod query;
pub mod router;
pub mod routes;
pub mod upload;

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use gl_core::config::Config;
use tokio::net::TcpListener;

use crate::context::AppContext;

/// Start the galleria server.
///
/// Builds the [`AppContext`] from `config`, binds the configured address and
/// serves until SIGINT or SIGTERM.
pub async fn start(config: Config) -> gl_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    tracing::info!(
        blobs = %config.storage.blob_path().display(),
        metadata = %config.storage.metadata_path().display(),
        "Using storage"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| gl_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let static_dir = config.server.static_dir.clone();
    let app = router::build_router(AppContext::new(config), static_dir);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| gl_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Starting server on {addr}");
    serve(listener, app, shutdown_signal()).await
}

/// Serve `app` on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> gl_core::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
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
                tracing::error!("Failed to install SIGTERM handler: {e}");
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

    tracing::info!("Shutdown signal received");
}
