//! Event stream endpoint.
//!
//! Registers a connection for the caller's client id and streams
//! `data: <json>\n\n` frames until the client goes away or the server stops.

use std::collections::HashMap;
use std::convert::Infallible;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use statecast_core::ChannelTransport;
use statecast_logging::{EventLogger, StreamEvent};

use crate::response::{envelope, CLIENT_ID_ERROR};
use crate::server::GatewayState;

/// Frames buffered between a connection loop and the response body.
const FRAME_BUFFER: usize = 64;

/// Handler for `GET <eventUrl>?<clientIdKey>=<uuid>`.
pub async fn stream_events(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let raw_client_id = params
        .get(&state.config.routes.client_id_key)
        .map(String::as_str);

    let (transport, frames) = ChannelTransport::pair(FRAME_BUFFER);
    let server = match state.hub.open_connection(raw_client_id, transport).await {
        Ok(server) => server,
        Err(e) => {
            warn!(error = %e, "Rejected event stream");
            EventLogger::log_event(raw_client_id, StreamEvent::Rejected { reason: e.to_string() });
            return envelope(StatusCode::BAD_REQUEST, CLIENT_ID_ERROR);
        }
    };

    let connection = server.connection().clone();
    EventLogger::log_event(
        Some(connection.client_id.as_str()),
        StreamEvent::Connected {
            connection_id: connection.connection_id,
        },
    );

    let delay = Duration::from_millis(state.config.stream.connected_delay_ms);
    tokio::spawn(server.run(delay));

    // Dropping the body (client gone, or shutdown) drops the receiver, which
    // the connection loop observes as a disconnect.
    let stream = ReceiverStream::new(frames)
        .map(Ok::<_, Infallible>)
        .take_until(state.shutdown_signal());

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}
