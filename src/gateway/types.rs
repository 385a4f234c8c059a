use std::sync::Arc;

use crate::config::GatewayConfig;

use super::error::ProxyError;
use super::proxy::BackendProxy;

/// Shared state handed to every gateway handler.
#[derive(Clone)]
pub struct GatewayContext {
    pub proxy: Arc<BackendProxy>,
    pub max_upload_bytes: usize,
}

impl GatewayContext {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ProxyError> {
        let proxy = BackendProxy::new(&config.backend_url, config.backend_timeout)?;
        Ok(Self {
            proxy: Arc::new(proxy),
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}
