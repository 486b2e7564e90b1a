//! Deck credential and the endpoint it resolves to.

use crate::DECK_URL_SCHEME;
use crate::config::EndpointConfig;
use crate::error::connection::ConnectionError;

use common::{ErrorLocation, RedactedToken};

use std::panic::Location;

use url::Url;

/// Instance identifier plus token, read from persisted settings.
///
/// Immutable once built. The manager captures a copy when it opens a
/// connection, so a settings change only takes effect on the next connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckAuth {
    instance: String,
    token: RedactedToken,
}

impl DeckAuth {
    pub fn new(instance: impl Into<String>, token: RedactedToken) -> Self {
        Self {
            instance: instance.into(),
            token,
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn token(&self) -> &RedactedToken {
        &self.token
    }

    /// `ws://<host>:<port>/<instance>` for this credential.
    ///
    /// The instance id is pushed as a single path segment, so it is
    /// percent-encoded rather than interpreted.
    pub fn endpoint_url(&self, endpoint: &EndpointConfig) -> Result<Url, ConnectionError> {
        let mut url = Url::parse(&format!(
            "{DECK_URL_SCHEME}://{}:{}",
            endpoint.host, endpoint.port
        ))?;

        url.path_segments_mut()
            .map_err(|_| ConnectionError::Url {
                message: format!("Endpoint {} cannot carry a path", endpoint.host),
                location: ErrorLocation::from(Location::caller()),
            })?
            .pop_if_empty()
            .push(&self.instance);

        Ok(url)
    }
}
