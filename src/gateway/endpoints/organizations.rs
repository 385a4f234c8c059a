use axum::extract::State;
use axum::http::{HeaderMap, Method};
use axum::response::Response;

use crate::gateway::error::{GatewayError, OrFail};
use crate::gateway::proxy::ForwardBody;
use crate::gateway::types::GatewayContext;

/// `GET /api/organizations/public`. The backend serves this under `/api/auth`.
pub async fn public(
    State(ctx): State<GatewayContext>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    ctx.proxy
        .forward(
            Method::GET,
            &["api", "auth", "organizations", "public"],
            &headers,
            ForwardBody::Empty,
        )
        .await
        .or_fail("Failed to fetch organizations")
}
