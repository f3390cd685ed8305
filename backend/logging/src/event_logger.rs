//! Stream Event Logger
//!
//! Structured stream and action lifecycle events, emitted under the
//! `statecast_events` target so they can be filtered or routed separately.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Connected {
        connection_id: String,
    },
    Rejected {
        reason: String,
    },
    ActionDispatched {
        action_type: String,
        payload_json: String,
    },
    ActionRejected {
        action_type: String,
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub client_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub event: StreamEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Logs a lifecycle event, redacting payloads first.
    pub fn log_event(client_id: Option<&str>, mut event: StreamEvent) {
        if let StreamEvent::ActionDispatched { payload_json, .. } = &mut event {
            *payload_json = redact_sensitive_data(payload_json);
        }

        let entry = EventLogEntry {
            client_id: client_id.map(str::to_string),
            timestamp: Utc::now(),
            event,
        };

        info!(target: "statecast_events", event = ?entry, "Stream event");
    }
}
