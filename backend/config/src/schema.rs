//! statecast configuration schema.
//!
//! Typed for serde YAML/JSON with camelCase keys. Every section and field is
//! optional in the file; missing values take the defaults below.

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_ACTION_URL, DEFAULT_BIND_ADDRESS, DEFAULT_BOOTSTRAP_URL, DEFAULT_BROKER_CAPACITY,
    DEFAULT_CLIENT_ID_KEY, DEFAULT_CONNECTED_DELAY_MS, DEFAULT_EVENT_URL, DEFAULT_LOG_LEVEL,
    DEFAULT_PORT, DEFAULT_RECONNECT_INTERVAL_MS,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatecastConfig {
    /// Listener settings
    pub server: ServerConfig,

    /// Endpoint paths and the client id parameter
    pub routes: RoutesConfig,

    /// Streaming behavior
    pub stream: StreamConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Permissive CORS; browser clients post actions in `cors` mode.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            cors: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutesConfig {
    /// `GET` path of the event stream
    pub event_url: String,
    /// `POST` path for actions
    pub action_url: String,
    /// `GET` path of the client bootstrap document
    pub bootstrap_url: String,
    /// Query parameter (streams) and header (actions) carrying the client id
    pub client_id_key: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            event_url: DEFAULT_EVENT_URL.to_string(),
            action_url: DEFAULT_ACTION_URL.to_string(),
            bootstrap_url: DEFAULT_BOOTSTRAP_URL.to_string(),
            client_id_key: DEFAULT_CLIENT_ID_KEY.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamConfig {
    /// How long clients wait before reconnecting a dropped stream
    pub reconnect_interval_ms: i64,
    /// Delay before the `connected` notification
    pub connected_delay_ms: u64,
    /// Messages a subscriber may fall behind before it skips the oldest
    pub broker_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
            connected_delay_ms: DEFAULT_CONNECTED_DELAY_MS,
            broker_capacity: DEFAULT_BROKER_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    /// Directory for rolling NDJSON logs; console only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            dir: None,
        }
    }
}
