//! HTTP middleware.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse as _, Response};

use crate::ApiError;

/// Logging middleware.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    tracing::info!(method = %method, uri = %uri, "incoming request");

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        "request completed"
    );

    response
}

/// Bearer token required by the admin routes. `None` locks them entirely.
#[derive(Clone)]
pub struct AdminToken(pub Option<Arc<str>>);

/// Reject requests without the admin bearer token.
pub async fn require_admin(
    State(AdminToken(expected)): State<AdminToken>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = {
        let presented = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        match (expected.as_deref(), presented) {
            (Some(expected), Some(presented)) => constant_time_eq(expected, presented),
            _ => false,
        }
    };

    if !authorized {
        tracing::warn!(uri = %request.uri(), "rejected admin request");
        return ApiError::Unauthorized.into_response();
    }

    next.run(request).await
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.bytes().zip(b.bytes()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}
