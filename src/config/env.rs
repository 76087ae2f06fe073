//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `COURIER_MATRIX_HOMESERVER` - Matrix homeserver URL
//! - `COURIER_MATRIX_USER_ID` - Matrix account user id
//! - `COURIER_MATRIX_ACCESS_TOKEN` - Matrix access token
//! - `COURIER_DELTA_ADDR` - Delta Chat email address
//! - `COURIER_DELTA_PASSWORD` - Delta Chat account password
//! - `COURIER_STORAGE_PATH` - SQLite database path

use std::env;

use crate::config::types::{Config, StorageConfig};

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "COURIER";

/// Apply environment variable overrides to a config.
///
/// This allows sensitive values like tokens and passwords to be
/// provided via environment variables instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    // Matrix session
    if let Ok(homeserver) = env::var(format!("{}_MATRIX_HOMESERVER", ENV_PREFIX)) {
        config.matrix.homeserver = homeserver;
    }
    if let Ok(user_id) = env::var(format!("{}_MATRIX_USER_ID", ENV_PREFIX)) {
        config.matrix.user_id = user_id;
    }
    if let Ok(token) = env::var(format!("{}_MATRIX_ACCESS_TOKEN", ENV_PREFIX)) {
        config.matrix.access_token = token;
    }

    // Delta Chat account
    if let Ok(addr) = env::var(format!("{}_DELTA_ADDR", ENV_PREFIX)) {
        config.delta.addr = addr;
    }
    if let Ok(password) = env::var(format!("{}_DELTA_PASSWORD", ENV_PREFIX)) {
        config.delta.password = password;
    }

    // Storage
    if let Ok(path) = env::var(format!("{}_STORAGE_PATH", ENV_PREFIX)) {
        match config.storage {
            Some(ref mut storage) => storage.path = Some(path),
            None => config.storage = Some(StorageConfig { path: Some(path) }),
        }
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `COURIER_CONFIG` environment variable, otherwise returns "courier.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "courier.conf".to_string())
}
