use crate::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Raised when a secret value is pushed through a path that would expose it.
#[derive(Debug, ThisError)]
pub enum RedactError {
    #[error("Secret Serialization Error: {message} {location}")]
    Serialization {
        message: String,
        location: ErrorLocation,
    },
}

impl RedactError {
    #[track_caller]
    pub fn serialization(message: impl Into<String>) -> Self {
        RedactError::Serialization {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
