//! Config validation with user-friendly error messages.

use crate::schema::StatecastConfig;
use thiserror::Error;

/// Path the gateway always serves its health report on.
pub const RESERVED_HEALTH_PATH: &str = "/health";

/// Connected-notification delays above this are almost certainly a mistake.
const CONNECTED_DELAY_WARN_MS: u64 = 10_000;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &StatecastConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_routes(config, &mut report);
    validate_stream(config, &mut report);
    report
}

fn validate_server(config: &StatecastConfig, report: &mut ValidationReport) {
    if config.server.port == 0 {
        report.error("server.port", "port must be > 0");
    }
    if config.server.bind_address.trim().is_empty() {
        report.error("server.bindAddress", "bind address cannot be empty");
    }
}

/// Paths must be absolute and distinct; the client id key must be set.
fn validate_routes(config: &StatecastConfig, report: &mut ValidationReport) {
    let routes = &config.routes;
    let paths = [
        ("routes.eventUrl", &routes.event_url),
        ("routes.actionUrl", &routes.action_url),
        ("routes.bootstrapUrl", &routes.bootstrap_url),
    ];
    for (path, value) in paths {
        if !value.starts_with('/') {
            report.error(path, format!("path must start with '/': {value:?}"));
        }
        if value.as_str() == RESERVED_HEALTH_PATH {
            report.error(path, format!("{RESERVED_HEALTH_PATH} is reserved for the health report"));
        }
    }
    for (i, (path_a, a)) in paths.iter().enumerate() {
        for (path_b, b) in paths.iter().skip(i + 1) {
            if a == b {
                report.error(*path_b, format!("path {b:?} is already used by {path_a}"));
            }
        }
    }
    if routes.client_id_key.trim().is_empty() {
        report.error("routes.clientIdKey", "client id key cannot be empty");
    }
}

fn validate_stream(config: &StatecastConfig, report: &mut ValidationReport) {
    if config.stream.broker_capacity == 0 {
        report.error("stream.brokerCapacity", "brokerCapacity must be > 0");
    }
    if config.stream.connected_delay_ms > CONNECTED_DELAY_WARN_MS {
        report.warn(
            "stream.connectedDelayMs",
            "connected notification is delayed by more than 10s",
        );
    }
}
