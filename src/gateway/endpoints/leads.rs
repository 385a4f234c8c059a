use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method};
use axum::response::Response;

use crate::gateway::error::{GatewayError, OrFail};
use crate::gateway::proxy::ForwardBody;
use crate::gateway::types::GatewayContext;

const CREATE_FAILED: &str = "Failed to create lead";

/// `GET /api/leads`
pub async fn list(
    State(ctx): State<GatewayContext>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    ctx.proxy
        .forward(Method::GET, &["api", "leads"], &headers, ForwardBody::Empty)
        .await
        .or_fail("Failed to fetch leads")
}

/// `POST /api/leads`. The backend registers its create route with a
/// trailing slash.
pub async fn create(
    State(ctx): State<GatewayContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let body = ForwardBody::json(&body).or_fail(CREATE_FAILED)?;
    ctx.proxy
        .forward(Method::POST, &["api", "leads", ""], &headers, body)
        .await
        .or_fail(CREATE_FAILED)
}
