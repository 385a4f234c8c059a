use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method};
use axum::response::Response;

use crate::gateway::error::{GatewayError, OrFail};
use crate::gateway::proxy::ForwardBody;
use crate::gateway::types::GatewayContext;

/// `POST /api/speech/chat/voice`: multipart audio turn.
///
/// The body is forwarded byte for byte with its original Content-Type
/// (which carries the multipart boundary); it is never parsed here.
pub async fn voice_chat(
    State(ctx): State<GatewayContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    tracing::debug!(bytes = body.len(), "Forwarding voice upload");
    ctx.proxy
        .forward(
            Method::POST,
            &["api", "speech", "chat", "voice"],
            &headers,
            ForwardBody::raw(&headers, body),
        )
        .await
        .or_fail("Failed to process voice chat request")
}
