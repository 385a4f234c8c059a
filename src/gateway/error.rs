//! Gateway error types. Every proxy failure becomes HTTP 500 with a
//! route-specific message; internals only go to the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Why a forward did not produce a relayable backend response.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Backend returned a non-JSON body (status {status})")]
    NonJson { status: u16 },
    #[error("Request body is not valid JSON: {0}")]
    InvalidRequestBody(String),
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

/// Body of every gateway failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

/// A failed proxy call on one route.
#[derive(Debug, thiserror::Error)]
#[error("{message}: {source}")]
pub struct GatewayError {
    pub message: &'static str,
    pub source: ProxyError,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.source, "{}", self.message);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Attach the route's public failure message.
pub trait OrFail<T> {
    fn or_fail(self, message: &'static str) -> Result<T, GatewayError>;
}

impl<T> OrFail<T> for Result<T, ProxyError> {
    fn or_fail(self, message: &'static str) -> Result<T, GatewayError> {
        self.map_err(|source| GatewayError { message, source })
    }
}
