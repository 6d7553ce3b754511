//! Response helpers shared by handlers and the error dispatcher.
//!
//! Error bodies are `{"error": <message>}` except 400 and 402, which use
//! `{"code": ..., "reason": ...}` so clients can branch on the code.

use std::fmt::Display;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use restkit_core::PaginationInfo;
use serde::Serialize;
use serde_json::json;

pub const GENERIC_ERROR: &str = "An error has occurred";

pub fn ok<T: Serialize>(body: T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

pub fn created<T: Serialize>(body: T) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// A page of items with its pagination info.
pub fn paginated<T: Serialize>(items: &[T], info: &PaginationInfo) -> Response {
    ok(json!({ "items": items, "pagination": info }))
}

pub fn bad_request<R: Serialize>(reason: R) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "code": "validation_error", "reason": reason })),
    )
        .into_response()
}

pub fn payment_required<C: Serialize, R: Serialize>(code: C, reason: R) -> Response {
    (StatusCode::PAYMENT_REQUIRED, Json(json!({ "code": code, "reason": reason }))).into_response()
}

pub fn unauthorized(message: Option<&str>) -> Response {
    error(StatusCode::UNAUTHORIZED, message.unwrap_or("Invalid credentials"))
}

pub fn forbidden(message: Option<&str>) -> Response {
    error(StatusCode::FORBIDDEN, message.unwrap_or("Permission denied"))
}

pub fn not_found(message: Option<&str>) -> Response {
    error(StatusCode::NOT_FOUND, message.unwrap_or("Resource not found"))
}

pub fn conflict(message: Option<&str>) -> Response {
    error(StatusCode::CONFLICT, message.unwrap_or("Resource conflict"))
}

/// Log `cause` and answer with a generic 500; internals never reach clients.
pub fn internal_server_error(cause: &dyn Display) -> Response {
    tracing::error!(error = %cause, "internal server error");
    error(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR)
}

pub fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
