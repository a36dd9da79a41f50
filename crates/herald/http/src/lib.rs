//! Herald HTTP Layer
//!
//! Axum handlers for device registration and the admin broadcast trigger.

mod admin;
mod error;
mod middleware;
mod register;

pub use admin::*;
pub use error::*;
pub use middleware::*;
pub use register::*;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderMap;

/// Header carrying the authenticated caller, set by the upstream gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Generic `{"success": true, "message": ...}` response.
#[derive(Debug, serde::Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

impl MessageResponse {
    pub fn ok(message: &'static str) -> Self {
        Self {
            success: true,
            message,
        }
    }
}

/// Authenticated caller identity, if any.
pub fn caller_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Create the device registration router.
pub fn registration_router<R>(registrar: R) -> Router
where
    R: herald_service::Registrar + Clone + 'static,
{
    use axum::routing::post;

    Router::new()
        .route(
            "/api/push/register",
            post(register::register_handler::<R>).delete(register::unregister_handler::<R>),
        )
        .with_state(registrar)
}

/// Create the admin router, gated by `admin_token`.
pub fn admin_router<B>(broadcaster: B, admin_token: Option<String>) -> Router
where
    B: herald_service::Broadcaster + Clone + 'static,
{
    use axum::routing::{get, post};

    let token = AdminToken(admin_token.filter(|t| !t.is_empty()).map(Arc::from));

    Router::new()
        .route("/api/admin/push/send", post(admin::send_handler::<B>))
        .route("/api/admin/push/log", get(admin::log_handler::<B>))
        .route_layer(axum::middleware::from_fn_with_state(
            token,
            middleware::require_admin,
        ))
        .with_state(broadcaster)
}
