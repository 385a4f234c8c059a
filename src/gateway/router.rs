//! Gateway router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Layer stack (outermost → innermost):
//! 1. CORS → 2. `Cache-Control: no-store` → 3. Access log → 4. Body limit

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use super::endpoints;
use super::middleware;
use super::types::GatewayContext;

/// Build the gateway router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn gateway_router(ctx: GatewayContext) -> Router {
    let max_body = ctx.max_upload_bytes;

    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/login", post(endpoints::auth::login))
        .route("/auth/register", post(endpoints::auth::register))
        .route("/auth/logout", post(endpoints::auth::logout))
        .route(
            "/auth/me",
            get(endpoints::auth::me).put(endpoints::auth::update_me),
        )
        .route("/auth/usage", get(endpoints::auth::usage))
        .route(
            "/organizations/public",
            get(endpoints::organizations::public),
        )
        .route("/chat", post(endpoints::chat::send))
        .route("/chat/history/:lead_id", get(endpoints::chat::history))
        .route(
            "/leads",
            get(endpoints::leads::list).post(endpoints::leads::create),
        )
        .route(
            "/speech/chat/voice",
            post(endpoints::speech::voice_chat),
        )
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        // Innermost first, outermost last:
        .layer(DefaultBodyLimit::max(max_body))
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive())
}
