//! services/planner/src/web/rest.rs
//!
//! Plain HTTP endpoints next to the WebSocket form session.

use axum::http::StatusCode;

/// Liveness probe.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
