//! Application settings for the gateway and the client controllers.
//!
//! Everything is read from the environment with defaults suitable for a
//! local development setup (gateway on :3000, sales backend on :3001).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::i18n::Language;

/// Application-level constants
pub const APP_NAME: &str = "SalesDesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Conversation stage sent with every chat request. Opaque to the client.
pub const DEFAULT_CONVERSATION_STAGE: &str = "discovery";

const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_PROVIDER: &str = "openai";

/// Backend calls include transcription + generation, so allow a long wait.
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 120;

/// Voice uploads are the largest bodies the gateway accepts.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "salesdesk_lib=info,salesdesk=info,tower_http=warn"
}

/// Get the application data directory (`<platform data dir>/SalesDesk`).
/// `None` when the platform has no resolvable data directory.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_NAME))
}

/// File backing the persisted auth session.
pub fn session_file() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("session.json"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Strip trailing slashes so paths can be appended with `format!`.
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

// ═══════════════════════════════════════════════════════════
// Gateway
// ═══════════════════════════════════════════════════════════

/// Settings for the backend gateway service.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the external sales backend.
    pub backend_url: String,
    /// Address the gateway listens on.
    pub bind_addr: SocketAddr,
    /// Per-request timeout for backend calls.
    pub backend_timeout: Duration,
    /// Largest request body accepted (voice uploads).
    pub max_upload_bytes: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid bind address '{value}': {reason}")]
    InvalidBindAddr { value: String, reason: String },
}

impl GatewayConfig {
    /// Read `BACKEND_URL` and `SALESDESK_BIND_ADDR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind = env_or("SALESDESK_BIND_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr = bind
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidBindAddr {
                value: bind.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            backend_url: normalize_base_url(&env_or("BACKEND_URL", DEFAULT_BACKEND_URL)),
            bind_addr,
            backend_timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        })
    }

    /// Config pointing at an explicit backend, listening on an ephemeral
    /// localhost port.
    pub fn for_backend(backend_url: &str) -> Self {
        Self {
            backend_url: normalize_base_url(backend_url),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            backend_timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Client
// ═══════════════════════════════════════════════════════════

/// Settings for the client-side controllers.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the gateway (not the backend).
    pub gateway_url: String,
    pub language: Language,
    /// AI provider label forwarded to the backend.
    pub provider: String,
    pub conversation_stage: String,
}

impl ClientConfig {
    /// Read `SALESDESK_GATEWAY_URL`, `SALESDESK_LANGUAGE`, `SALESDESK_PROVIDER`.
    pub fn from_env() -> Self {
        let language = Language::parse(&env_or("SALESDESK_LANGUAGE", "en")).unwrap_or_default();
        Self {
            gateway_url: normalize_base_url(&env_or("SALESDESK_GATEWAY_URL", DEFAULT_GATEWAY_URL)),
            language,
            provider: env_or("SALESDESK_PROVIDER", DEFAULT_PROVIDER),
            conversation_stage: DEFAULT_CONVERSATION_STAGE.to_string(),
        }
    }

    pub fn for_gateway(gateway_url: &str) -> Self {
        Self {
            gateway_url: normalize_base_url(gateway_url),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            language: Language::default(),
            provider: DEFAULT_PROVIDER.to_string(),
            conversation_stage: DEFAULT_CONVERSATION_STAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_ends_with_app_name() {
        if let Some(dir) = app_data_dir() {
            assert!(dir.ends_with("SalesDesk"));
        }
    }

    #[test]
    fn session_file_under_app_data() {
        if let (Some(file), Some(dir)) = (session_file(), app_data_dir()) {
            assert!(file.starts_with(dir));
            assert!(file.ends_with("session.json"));
        }
    }

    #[test]
    fn normalize_trims_trailing_slashes() {
        assert_eq!(normalize_base_url("http://host:3001///"), "http://host:3001");
        assert_eq!(normalize_base_url(" http://host "), "http://host");
    }

    #[test]
    fn for_backend_uses_ephemeral_port() {
        let cfg = GatewayConfig::for_backend("http://backend/");
        assert_eq!(cfg.backend_url, "http://backend");
        assert_eq!(cfg.bind_addr.port(), 0);
        assert!(cfg.max_upload_bytes >= 1024 * 1024);
    }

    #[test]
    fn client_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.conversation_stage, "discovery");
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.language, Language::English);
    }

    #[test]
    fn app_name_is_salesdesk() {
        assert_eq!(APP_NAME, "SalesDesk");
    }
}
