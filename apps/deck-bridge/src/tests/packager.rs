use crate::packager::JsonPackager;
use crate::snapshot::{AppSnapshot, FileStateSource};

use deck_core::collaborators::package_state;

use std::sync::Arc;

use serde_json::{Value, json};

/// **VALUE**: Each `state` section is lifted from the matching part of the snapshot.
///
/// **BUG THIS CATCHES**: Would catch max power being read for the wrong
/// character, or absent sections turning into something other than `null`.
#[test]
fn given_snapshot_when_packaging_then_sections_come_from_current_character() {
    let snapshot = Arc::new(
        AppSnapshot::parse(
            r#"{
                "currentCharacterId": "b",
                "characters": {
                    "a": { "postmaster": "a-post", "equippedItems": ["a-item"] },
                    "b": { "postmaster": "b-post", "equippedItems": ["b-item"] }
                },
                "maxPower": { "a": 1990, "b": 2005 },
                "vault": { "glimmer": 7 }
            }"#,
        )
        .unwrap(),
    );
    let character = snapshot.current_character().unwrap();

    let payload = package_state::<FileStateSource, _>(&JsonPackager, &snapshot, &character);

    assert_eq!(payload.postmaster, json!("b-post"));
    assert_eq!(payload.equipped_items, json!(["b-item"]));
    assert_eq!(payload.max_power, json!(2005));
    assert_eq!(payload.vault, json!({ "glimmer": 7 }));
    assert_eq!(payload.metrics, Value::Null);
}

#[test]
fn given_no_max_power_for_character_when_packaging_then_null() {
    let snapshot = Arc::new(
        AppSnapshot::parse(r#"{ "currentCharacterId": "a", "characters": { "a": {} } }"#)
            .unwrap(),
    );
    let character = snapshot.current_character().unwrap();

    let payload = package_state::<FileStateSource, _>(&JsonPackager, &snapshot, &character);

    assert_eq!(payload.max_power, Value::Null);
    assert_eq!(payload.postmaster, Value::Null);
}
