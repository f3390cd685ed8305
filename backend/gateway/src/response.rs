//! JSON envelope returned by the stream and action endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use statecast_core::ActionResponse;

/// Body text of a stream rejected for a missing or malformed client id.
pub const CLIENT_ID_ERROR: &str = "clientId not found in header";

pub fn envelope(status: StatusCode, error: impl Into<String>) -> Response {
    let body = if status.is_success() {
        ActionResponse::ok()
    } else {
        ActionResponse::failed(status.as_u16(), error)
    };
    (status, Json(body)).into_response()
}
