use common::ErrorLocation;

use deck_core::error::CoreError;
use deck_core::error::config::ConfigError;
use deck_core::error::connection::ConnectionError;

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors raised by the bridge binary and its collaborators.
///
/// Serializable so the host application can read them back from logs or a
/// status endpoint without losing the variant or call site.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum BridgeError {
    /// Error from this app (startup, logging, paths)
    #[error("Bridge Error: {message} {location}")]
    Bridge {
        message: String,
        location: ErrorLocation,
    },

    /// Error from deck-core (config, connection, protocol)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// Application snapshot could not be read or parsed
    #[error("Snapshot Error: {message} {location}")]
    Snapshot {
        message: String,
        location: ErrorLocation,
    },

    /// Inbound command could not be recorded
    #[error("Dispatch Error: {message} {location}")]
    Dispatch {
        message: String,
        location: ErrorLocation,
    },
}

impl BridgeError {
    #[track_caller]
    pub fn bridge(message: impl Into<String>) -> Self {
        BridgeError::Bridge {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn snapshot(message: impl Into<String>) -> Self {
        BridgeError::Snapshot {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn dispatch(message: impl Into<String>) -> Self {
        BridgeError::Dispatch {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<CoreError> for BridgeError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        BridgeError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for BridgeError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        BridgeError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConnectionError> for BridgeError {
    #[track_caller]
    fn from(error: ConnectionError) -> Self {
        BridgeError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
