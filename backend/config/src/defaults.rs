//! Config defaults: normalizes values a file may leave empty or out of range.

use crate::schema::StatecastConfig;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 40000;
pub const DEFAULT_EVENT_URL: &str = "/events";
pub const DEFAULT_ACTION_URL: &str = "/action";
pub const DEFAULT_BOOTSTRAP_URL: &str = "/bootstrap";
pub const DEFAULT_CLIENT_ID_KEY: &str = "clientId";
pub const DEFAULT_RECONNECT_INTERVAL_MS: i64 = 5000;
pub const DEFAULT_CONNECTED_DELAY_MS: u64 = 100;
pub const DEFAULT_BROKER_CAPACITY: usize = 1024;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: StatecastConfig) -> StatecastConfig {
    let config = apply_route_defaults(config);
    let config = apply_stream_defaults(config);
    apply_logging_defaults(config)
}

/// Blank route settings fall back to the defaults.
fn apply_route_defaults(mut config: StatecastConfig) -> StatecastConfig {
    let routes = &mut config.routes;
    fill_blank(&mut routes.event_url, DEFAULT_EVENT_URL);
    fill_blank(&mut routes.action_url, DEFAULT_ACTION_URL);
    fill_blank(&mut routes.bootstrap_url, DEFAULT_BOOTSTRAP_URL);
    fill_blank(&mut routes.client_id_key, DEFAULT_CLIENT_ID_KEY);
    config
}

/// A reconnect interval below 1ms means "unset".
fn apply_stream_defaults(mut config: StatecastConfig) -> StatecastConfig {
    if config.stream.reconnect_interval_ms < 1 {
        config.stream.reconnect_interval_ms = DEFAULT_RECONNECT_INTERVAL_MS;
    }
    config
}

fn apply_logging_defaults(mut config: StatecastConfig) -> StatecastConfig {
    fill_blank(&mut config.logging.level, DEFAULT_LOG_LEVEL);
    if config.logging.dir.as_deref().is_some_and(|d| d.trim().is_empty()) {
        config.logging.dir = None;
    }
    config
}

fn fill_blank(value: &mut String, default: &str) {
    if value.trim().is_empty() {
        *value = default.to_string();
    }
}
