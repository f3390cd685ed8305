//! Action endpoint.
//!
//! Decodes `{"type", "payload"}` and dispatches it to the registered handler.
//! Decode and dispatch failures both answer `500` with the error text.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use tracing::debug;

use statecast_core::Message;
use statecast_logging::{EventLogger, StreamEvent};

use crate::response::envelope;
use crate::server::GatewayState;

/// Handler for `POST <actionUrl>`.
pub async fn post_action(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let message: Message = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, "Malformed action body");
            return envelope(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let client_id = caller_client_id(&headers, &params, &state.config.routes.client_id_key);
    let action_type = message.kind.clone();
    let payload_json = message.payload.to_string();

    match state.hub.dispatch(message, client_id.clone()).await {
        Ok(()) => {
            EventLogger::log_event(
                client_id.as_deref(),
                StreamEvent::ActionDispatched {
                    action_type,
                    payload_json,
                },
            );
            envelope(StatusCode::OK, "")
        }
        Err(e) => {
            EventLogger::log_event(
                client_id.as_deref(),
                StreamEvent::ActionRejected {
                    action_type,
                    error_msg: e.to_string(),
                },
            );
            envelope(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// The sender's client id: header first, then query parameter.
fn caller_client_id(
    headers: &HeaderMap,
    params: &HashMap<String, String>,
    key: &str,
) -> Option<String> {
    headers
        .get(key)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| params.get(key).cloned())
        .filter(|id| !id.trim().is_empty())
}
