//! Where the bridge keeps its files.
//!
//! - config dir: `deck.json`, `snapshot.json`, `commands.jsonl`
//! - log dir: `deck-bridge.log`

use crate::error::BridgeError;

use std::ffi::OsString;
use std::path::PathBuf;

pub const APP_DIR_NAME: &str = "deck-bridge";
pub const CONFIG_DIR_ENV: &str = "DECK_BRIDGE_CONFIG_DIR";
pub const LOG_DIR_ENV: &str = "DECK_BRIDGE_LOG_DIR";

const LOG_DIR_NAME: &str = "logs";

/// `$DECK_BRIDGE_CONFIG_DIR`, else `<platform config dir>/deck-bridge`.
pub fn config_dir() -> Result<PathBuf, BridgeError> {
    config_dir_from(std::env::var_os(CONFIG_DIR_ENV))
}

/// `$DECK_BRIDGE_LOG_DIR`, else `<platform local data dir>/deck-bridge/logs`.
pub fn log_dir() -> Result<PathBuf, BridgeError> {
    log_dir_from(std::env::var_os(LOG_DIR_ENV))
}

pub fn config_dir_from(override_dir: Option<OsString>) -> Result<PathBuf, BridgeError> {
    if let Some(dir) = non_empty(override_dir) {
        return Ok(dir);
    }

    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| BridgeError::bridge("Could not determine config directory"))
}

pub fn log_dir_from(override_dir: Option<OsString>) -> Result<PathBuf, BridgeError> {
    if let Some(dir) = non_empty(override_dir) {
        return Ok(dir);
    }

    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(LOG_DIR_NAME))
        .ok_or_else(|| BridgeError::bridge("Could not determine local data directory"))
}

fn non_empty(value: Option<OsString>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}
