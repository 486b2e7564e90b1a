use crate::error::protocol::ProtocolError;

use serde::Serialize;
use serde_json::Value;

/// Message pushed to the deck. Fire-and-forget: no acknowledgement, no retry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// Farming mode is active for some character.
    FarmingMode(bool),

    /// Full state push, sent on every refresh cycle.
    State(StatePayload),

    /// An item was equipped on, or removed from, the current character.
    EquipmentStatus(EquipmentStatus),
}

impl OutboundMessage {
    /// The `action` tag this message travels under, for logging.
    pub fn action(&self) -> &'static str {
        match self {
            OutboundMessage::FarmingMode(_) => "farmingMode",
            OutboundMessage::State(_) => "state",
            OutboundMessage::EquipmentStatus(_) => "equipmentStatus",
        }
    }
}

/// Composite payload built by the packager for the current character.
///
/// Each section is opaque to the connection layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    pub postmaster: Value,
    pub max_power: Value,
    pub vault: Value,
    pub metrics: Value,
    pub equipped_items: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentStatus {
    pub item_id: String,
    pub equipped: bool,
}

pub fn encode(message: &OutboundMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(|e| ProtocolError::encode(&e))
}
