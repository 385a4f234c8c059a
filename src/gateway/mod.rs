//! Backend gateway.
//!
//! A thin HTTP service between the UI and the external sales backend.
//! Every route forwards to exactly one backend endpoint, passing the
//! caller's `Authorization` header through, and relays the backend's
//! status and JSON body unchanged. Failures become a 500 with a generic
//! per-route message.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod proxy;
pub mod router;
pub mod server;
pub mod types;

pub use error::{GatewayError, ProxyError};
pub use router::gateway_router;
pub use server::{start_gateway, GatewayServer, ServerError};
pub use types::GatewayContext;
