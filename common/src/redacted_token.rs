//! Deck auth token that never exposes its value in logs or debug output.

use crate::RedactError;

use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Error as SerError, Serialize, Serializer};
use zeroize::Zeroize;

const REDACTED_MARKER: &str = "[REDACTED TOKEN]";

/// The token half of a deck credential.
///
/// Read from persisted settings and forwarded with every inbound command.
/// `Debug` and `Display` print a marker instead of the value, serialization
/// is refused, and the buffer is wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct RedactedToken {
    inner: String,
}

impl RedactedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            inner: token.into(),
        }
    }

    /// The raw token, for handing to the command dispatcher.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for RedactedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedToken({REDACTED_MARKER})")
    }
}

impl fmt::Display for RedactedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED_MARKER)
    }
}

impl Drop for RedactedToken {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl Serialize for RedactedToken {
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Err(S::Error::custom(RedactError::serialization(
            "RedactedToken cannot be serialized - use as_str() explicitly",
        )))
    }
}

impl<'de> Deserialize<'de> for RedactedToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(RedactedToken::new)
    }
}
