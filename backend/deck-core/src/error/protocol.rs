use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("Message Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Message Decode Error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },
}

impl ProtocolError {
    #[track_caller]
    pub fn encode(error: &serde_json::Error) -> Self {
        ProtocolError::Encode {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn decode(error: &serde_json::Error) -> Self {
        ProtocolError::Decode {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
