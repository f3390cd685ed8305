use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::ClientConnection;

/// Message type of the notification sent to a client once its stream is open.
pub const CONNECTED_TYPE: &str = "connected";

/// Action type a handler named `name` answers to, e.g. `[counter] operation`.
pub fn action_type_for(name: &str) -> String {
    format!("[{name}] operation")
}

/// Broadcast topic a handler named `name` publishes its state under, e.g. `[counter] update`.
pub fn update_type_for(name: &str) -> String {
    format!("[{name}] update")
}

/// The wire envelope shared by inbound actions and outbound broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Message {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Serialize into one event-stream frame: `data: <json>\n\n`.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("data: {json}\n\n"))
    }
}

/// Decides whether a given connection should receive a broadcast.
pub type ClientFilter = Arc<dyn Fn(&ClientConnection) -> bool + Send + Sync>;

/// A message paired with the filter every subscriber evaluates against its own connection.
///
/// Immutable once built; the broker hands each subscriber a shared reference.
#[derive(Clone)]
pub struct ChannelMessage {
    filter: ClientFilter,
    pub message: Message,
}

impl ChannelMessage {
    pub fn new<F>(message: Message, filter: F) -> Self
    where
        F: Fn(&ClientConnection) -> bool + Send + Sync + 'static,
    {
        Self {
            filter: Arc::new(filter),
            message,
        }
    }

    /// Deliver to every connection.
    pub fn to_all(message: Message) -> Self {
        Self::new(message, |_| true)
    }

    /// Deliver to every connection owned by `client_id`.
    pub fn to_client(message: Message, client_id: impl Into<String>) -> Self {
        let client_id = client_id.into();
        Self::new(message, move |conn| conn.client_id == client_id)
    }

    pub fn matches(&self, connection: &ClientConnection) -> bool {
        (self.filter)(connection)
    }
}

impl fmt::Debug for ChannelMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelMessage")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// JSON body returned by the action and stream endpoints on completion or rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub code: u16,
    pub error: String,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self {
            code: 200,
            error: String::new(),
        }
    }

    pub fn failed(code: u16, error: impl Into<String>) -> Self {
        Self {
            code,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_topic_conventions() {
        assert_eq!(action_type_for("counter"), "[counter] operation");
        assert_eq!(update_type_for("counter"), "[counter] update");
    }

    #[test]
    fn test_frame_format() {
        let msg = Message::new("connected", json!("abc"));
        let frame = msg.to_frame().unwrap();
        assert_eq!(frame, "data: {\"type\":\"connected\",\"payload\":\"abc\"}\n\n");
    }

    #[test]
    fn test_missing_payload_decodes_as_null() {
        let msg: Message = serde_json::from_str(r#"{"type":"[ghost] operation"}"#).unwrap();
        assert_eq!(msg.kind, "[ghost] operation");
        assert!(msg.payload.is_null());
    }

    #[test]
    fn test_client_filter() {
        let mine = ClientConnection::new("a");
        let other = ClientConnection::new("b");
        let msg = ChannelMessage::to_client(Message::new("x", Value::Null), "a");
        assert!(msg.matches(&mine));
        assert!(!msg.matches(&other));
        assert!(ChannelMessage::to_all(Message::new("x", Value::Null)).matches(&other));
    }

    #[test]
    fn test_action_response_wire_shape() {
        let body = serde_json::to_value(ActionResponse::ok()).unwrap();
        assert_eq!(body, json!({"code": 200, "error": ""}));
    }
}
