use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method};
use axum::response::Response;

use crate::gateway::error::{GatewayError, OrFail};
use crate::gateway::proxy::ForwardBody;
use crate::gateway::types::GatewayContext;

const SEND_FAILED: &str = "Failed to process chat request";
const HISTORY_FAILED: &str = "Failed to fetch chat history";

/// `POST /api/chat`: one text turn.
pub async fn send(
    State(ctx): State<GatewayContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let body = ForwardBody::json(&body).or_fail(SEND_FAILED)?;
    ctx.proxy
        .forward(Method::POST, &["api", "chat"], &headers, body)
        .await
        .or_fail(SEND_FAILED)
}

/// `GET /api/chat/history/:lead_id`
pub async fn history(
    State(ctx): State<GatewayContext>,
    Path(lead_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    ctx.proxy
        .forward(
            Method::GET,
            &["api", "chat", "history", &lead_id],
            &headers,
            ForwardBody::Empty,
        )
        .await
        .or_fail(HISTORY_FAILED)
}
