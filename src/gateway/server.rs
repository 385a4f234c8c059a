//! Gateway server lifecycle.
//!
//! bind → spawn background task → return handle with shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::error::ProxyError;
use super::router::gateway_router;
use super::types::GatewayContext;
use crate::config::GatewayConfig;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind gateway on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Failed to get server address: {0}")]
    LocalAddr(std::io::Error),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

/// Handle to a running gateway.
pub struct GatewayServer {
    pub addr: SocketAddr,
    pub started_at: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl GatewayServer {
    /// `http://<addr>`, for clients in the same process.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Signal graceful shutdown. In-flight requests are allowed to finish.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Gateway shutdown signal sent");
        }
    }

    /// Wait for the server task to exit.
    pub async fn stopped(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Gateway task failed: {e}");
            }
        }
    }
}

impl Drop for GatewayServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the gateway on `config.bind_addr` (port 0 picks an ephemeral port).
pub async fn start_gateway(config: &GatewayConfig) -> Result<GatewayServer, ServerError> {
    let ctx = GatewayContext::from_config(config)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind_addr,
            source,
        })?;
    let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

    let app = gateway_router(ctx);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let backend = config.backend_url.clone();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Gateway received shutdown signal");
        };

        tracing::info!(%addr, %backend, "Gateway started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Gateway server error: {e}");
        }

        tracing::info!("Gateway stopped");
    });

    Ok(GatewayServer {
        addr,
        started_at: chrono::Utc::now().to_rfc3339(),
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}
