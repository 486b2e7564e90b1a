use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ConnectionError {
    #[error("Endpoint URL Error: {message} {location}")]
    Url {
        message: String,
        location: ErrorLocation,
    },

    #[error("Connect Error: {message} {location}")]
    Connect {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Read Error: {message} {location}")]
    Read {
        message: String,
        location: ErrorLocation,
    },

    /// The manager actor has shut down; the handle is no longer usable.
    #[error("Connection Manager Stopped {location}")]
    ManagerStopped { location: ErrorLocation },
}

impl ConnectionError {
    #[track_caller]
    pub fn manager_stopped() -> Self {
        ConnectionError::ManagerStopped {
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn send(message: impl Into<String>) -> Self {
        ConnectionError::Send {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<url::ParseError> for ConnectionError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        ConnectionError::Url {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ConnectionError {
    #[track_caller]
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        ConnectionError::Connect {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
