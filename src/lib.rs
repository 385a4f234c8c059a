pub mod auth; // Session store, credentials, role checks
pub mod client; // Typed gateway client
pub mod config;
pub mod conversation; // Chat transcript controller
pub mod desk; // Directory + conversation + voice for one user
pub mod directory; // Sidebar session list
pub mod gateway; // Backend proxy service
pub mod i18n;
pub mod models;
pub mod voice; // Spoken turns and voice mode

use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, GatewayConfig};
use crate::gateway::{start_gateway, ServerError};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(#[source] std::io::Error),
}

/// Run the gateway until Ctrl-C.
pub async fn run() -> Result<(), RunError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} gateway starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = GatewayConfig::from_env()?;
    let mut server = start_gateway(&config).await?;
    tracing::info!(url = %server.url(), backend = %config.backend_url, "Gateway ready");

    let signal = tokio::signal::ctrl_c().await;
    server.shutdown();
    server.stopped().await;
    signal.map_err(RunError::Signal)?;

    tracing::info!("Gateway stopped");
    Ok(())
}
