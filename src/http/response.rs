//! Response helpers shared by the handlers.
//!
//! # Design Decisions
//! - Write endpoints answer with empty bodies; only the enablement toggle
//!   reports store failures with a JSON error body
//! - Read endpoints never fail; they degrade to an empty result

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub fn empty(status: StatusCode) -> Response {
    status.into_response()
}

pub fn error_json(status: StatusCode, error: &dyn std::fmt::Display) -> Response {
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

/// The empty JSON array read endpoints fall back to.
pub fn empty_list() -> Response {
    Json(json!([])).into_response()
}
