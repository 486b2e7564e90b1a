use crate::error::protocol::ProtocolError;
use crate::protocol::{EquipmentStatus, OutboundMessage, StatePayload, decode, encode};

use serde_json::{Value, json};

fn encoded(message: &OutboundMessage) -> Value {
    serde_json::from_str(&encode(message).unwrap()).unwrap()
}

/// **VALUE**: Every outbound frame is `{ "action": ..., "data": ... }`.
///
/// **WHY THIS MATTERS**: The deck plugin switches on `action` and reads `data`;
/// any other shape is silently ignored on the deck side.
#[test]
fn given_farming_mode_when_encoding_then_data_is_bare_boolean() {
    let value = encoded(&OutboundMessage::FarmingMode(true));

    assert_eq!(value, json!({ "action": "farmingMode", "data": true }));
}

#[test]
fn given_state_when_encoding_then_sections_use_camel_case_keys() {
    let message = OutboundMessage::State(StatePayload {
        postmaster: json!({ "total": 3 }),
        max_power: json!(2010),
        vault: json!({ "glimmer": 250000 }),
        metrics: json!({}),
        equipped_items: json!(["a", "b"]),
    });

    let value = encoded(&message);

    assert_eq!(value["action"], "state");
    assert_eq!(value["data"]["postmaster"], json!({ "total": 3 }));
    assert_eq!(value["data"]["maxPower"], json!(2010));
    assert_eq!(value["data"]["vault"], json!({ "glimmer": 250000 }));
    assert_eq!(value["data"]["metrics"], json!({}));
    assert_eq!(value["data"]["equippedItems"], json!(["a", "b"]));
}

#[test]
fn given_equipment_status_when_encoding_then_matches_wire_shape() {
    let message = OutboundMessage::EquipmentStatus(EquipmentStatus {
        item_id: "6917529".to_string(),
        equipped: false,
    });

    let value = encoded(&message);

    assert_eq!(
        value,
        json!({
            "action": "equipmentStatus",
            "data": { "itemId": "6917529", "equipped": false }
        })
    );
    assert_eq!(message.action(), "equipmentStatus");
}

/// **VALUE**: Inbound command fields reach the dispatcher untouched.
///
/// **BUG THIS CATCHES**: Would catch the envelope swallowing fields it does not
/// know about, breaking commands added on the deck side.
#[test]
fn given_inbound_command_when_decoding_then_extra_fields_are_kept() {
    let message = decode(r#"{ "action": "equipItem", "item": "123", "loadout": 2 }"#).unwrap();

    assert_eq!(message.action, "equipItem");
    assert_eq!(message.field("item"), Some(&json!("123")));
    assert_eq!(message.field("loadout"), Some(&json!(2)));
    assert!(message.field("action").is_none());
    assert!(message.field("missing").is_none());
}

#[test]
fn given_malformed_text_when_decoding_then_returns_decode_error() {
    for text in ["not json", r#"{ "item": "123" }"#, "[1, 2]"] {
        let result = decode(text);

        assert!(
            matches!(result, Err(ProtocolError::Decode { .. })),
            "{text:?} should fail to decode"
        );
    }
}
