use crate::error::protocol::ProtocolError;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Command sent by the deck.
///
/// Only the envelope is typed here; interpreting `action` and `fields` is the
/// command dispatcher's job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundMessage {
    pub action: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl InboundMessage {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

pub fn decode(text: &str) -> Result<InboundMessage, ProtocolError> {
    serde_json::from_str(text).map_err(|e| ProtocolError::decode(&e))
}
