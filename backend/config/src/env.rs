//! Environment variable overrides for config values.
//!
//! Applied after the file is read, so the environment always wins.

use std::collections::HashMap;

use crate::schema::StatecastConfig;

pub const ENV_CONFIG_PATH: &str = "STATECAST_CONFIG";
pub const ENV_BIND: &str = "STATECAST_BIND";
pub const ENV_PORT: &str = "STATECAST_PORT";
pub const ENV_EVENT_URL: &str = "STATECAST_EVENT_URL";
pub const ENV_ACTION_URL: &str = "STATECAST_ACTION_URL";
pub const ENV_LOG_DIR: &str = "STATECAST_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "RUST_LOG";

/// Error returned when an override cannot be parsed.
#[derive(Debug, thiserror::Error)]
#[error("Invalid value {value:?} for env var \"{var_name}\": {reason}")]
pub struct InvalidEnvVarError {
    pub var_name: String,
    pub value: String,
    pub reason: String,
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: StatecastConfig) -> Result<StatecastConfig, InvalidEnvVarError> {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply overrides from a provided map (useful for testing).
pub fn apply_env_overrides_with(
    mut config: StatecastConfig,
    env: &HashMap<String, String>,
) -> Result<StatecastConfig, InvalidEnvVarError> {
    let get = |name: &str| env.get(name).filter(|v| !v.trim().is_empty()).cloned();

    if let Some(bind) = get(ENV_BIND) {
        config.server.bind_address = bind;
    }
    if let Some(port) = get(ENV_PORT) {
        config.server.port = port.trim().parse().map_err(|e: std::num::ParseIntError| {
            InvalidEnvVarError {
                var_name: ENV_PORT.to_string(),
                value: port.clone(),
                reason: e.to_string(),
            }
        })?;
    }
    if let Some(url) = get(ENV_EVENT_URL) {
        config.routes.event_url = url;
    }
    if let Some(url) = get(ENV_ACTION_URL) {
        config.routes.action_url = url;
    }
    if let Some(dir) = get(ENV_LOG_DIR) {
        config.logging.dir = Some(dir);
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }
    Ok(config)
}
