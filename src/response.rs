//! Response helpers. Records go out bare, without an envelope.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(data))
}

pub fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Flat `{"error": message}` body used by the lookup endpoint.
pub fn error_body(message: &str) -> Value {
    serde_json::json!({ "error": message })
}
