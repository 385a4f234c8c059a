//! Forwarding to the external sales backend.
//!
//! A forward preserves the method, the body (JSON re-serialized, anything
//! else as raw bytes with its Content-Type) and the caller's
//! `Authorization` header, then relays the backend status and JSON body
//! verbatim. No retries.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::Url;
use serde_json::Value;

use super::error::ProxyError;

/// What to send upstream.
#[derive(Debug)]
pub enum ForwardBody {
    Empty,
    Json(Value),
    /// Passed through untouched (multipart uploads).
    Raw {
        content_type: Option<HeaderValue>,
        bytes: Bytes,
    },
}

impl ForwardBody {
    /// Parse an incoming body as JSON. Invalid JSON is a failure of the
    /// route, like any other.
    pub fn json(bytes: &[u8]) -> Result<Self, ProxyError> {
        serde_json::from_slice(bytes)
            .map(Self::Json)
            .map_err(|e| ProxyError::InvalidRequestBody(e.to_string()))
    }

    pub fn raw(headers: &HeaderMap, bytes: Bytes) -> Self {
        Self::Raw {
            content_type: headers.get(header::CONTENT_TYPE).cloned(),
            bytes,
        }
    }
}

#[derive(Clone)]
pub struct BackendProxy {
    base_url: Url,
    http: reqwest::Client,
}

impl BackendProxy {
    pub fn new(backend_url: &str, timeout: Duration) -> Result<Self, ProxyError> {
        let base_url =
            Url::parse(backend_url).map_err(|e| ProxyError::InvalidUrl(format!("{backend_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ProxyError::InvalidUrl(backend_url.to_string()));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Backend URL for the given path segments. Segments are percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn forward(
        &self,
        method: Method,
        segments: &[&str],
        headers: &HeaderMap,
        body: ForwardBody,
    ) -> Result<Response, ProxyError> {
        let url = self.url(segments);
        tracing::debug!(%method, path = url.path(), "Forwarding to backend");

        let mut request = self.http.request(method, url);
        if let Some(auth) = headers.get(header::AUTHORIZATION) {
            request = request.header(header::AUTHORIZATION, auth.clone());
        }
        request = match body {
            ForwardBody::Empty => request,
            ForwardBody::Json(value) => request.json(&value),
            ForwardBody::Raw {
                content_type,
                bytes,
            } => {
                if let Some(content_type) = content_type {
                    request = request.header(header::CONTENT_TYPE, content_type);
                }
                request.body(bytes)
            }
        };

        let upstream = request.send().await?;
        let status = upstream.status();
        let bytes = upstream.bytes().await?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|_| ProxyError::NonJson {
            status: status.as_u16(),
        })?;

        Ok((status, Json(value)).into_response())
    }
}
