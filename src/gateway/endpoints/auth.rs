//! `/api/auth/*` pass-throughs.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method};
use axum::response::Response;

use crate::gateway::error::{GatewayError, OrFail};
use crate::gateway::proxy::ForwardBody;
use crate::gateway::types::GatewayContext;

const LOGIN_FAILED: &str = "Failed to process login request";
const REGISTER_FAILED: &str = "Failed to process registration request";
const LOGOUT_FAILED: &str = "Failed to process logout request";
const ME_FAILED: &str = "Failed to get user information";
const UPDATE_FAILED: &str = "Failed to update user information";
const USAGE_FAILED: &str = "Failed to get usage statistics";

/// `POST /api/auth/login`
pub async fn login(
    State(ctx): State<GatewayContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let body = ForwardBody::json(&body).or_fail(LOGIN_FAILED)?;
    ctx.proxy
        .forward(Method::POST, &["api", "auth", "login"], &headers, body)
        .await
        .or_fail(LOGIN_FAILED)
}

/// `POST /api/auth/register`
pub async fn register(
    State(ctx): State<GatewayContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let body = ForwardBody::json(&body).or_fail(REGISTER_FAILED)?;
    ctx.proxy
        .forward(Method::POST, &["api", "auth", "register"], &headers, body)
        .await
        .or_fail(REGISTER_FAILED)
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(ctx): State<GatewayContext>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    ctx.proxy
        .forward(Method::POST, &["api", "auth", "logout"], &headers, ForwardBody::Empty)
        .await
        .or_fail(LOGOUT_FAILED)
}

/// `GET /api/auth/me`
pub async fn me(
    State(ctx): State<GatewayContext>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    ctx.proxy
        .forward(Method::GET, &["api", "auth", "me"], &headers, ForwardBody::Empty)
        .await
        .or_fail(ME_FAILED)
}

/// `PUT /api/auth/me`
pub async fn update_me(
    State(ctx): State<GatewayContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let body = ForwardBody::json(&body).or_fail(UPDATE_FAILED)?;
    ctx.proxy
        .forward(Method::PUT, &["api", "auth", "me"], &headers, body)
        .await
        .or_fail(UPDATE_FAILED)
}

/// `GET /api/auth/usage`
pub async fn usage(
    State(ctx): State<GatewayContext>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    ctx.proxy
        .forward(Method::GET, &["api", "auth", "usage"], &headers, ForwardBody::Empty)
        .await
        .or_fail(USAGE_FAILED)
}
