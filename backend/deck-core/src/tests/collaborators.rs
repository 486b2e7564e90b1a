use crate::collaborators::{Packager, Readiness, StateSource, package_state};

use serde_json::{Value, json};
use tokio::sync::{broadcast, watch};

struct FixedSource;

impl StateSource for FixedSource {
    type Snapshot = Value;
    type Character = String;

    fn readiness(&self) -> Readiness {
        Readiness::ready()
    }

    fn snapshot(&self) -> Value {
        json!({ "vault": 42 })
    }

    fn current_character(&self, _snapshot: &Value) -> Option<String> {
        Some("warlock".to_string())
    }

    fn character_id<'a>(&self, character: &'a String) -> &'a str {
        character
    }

    fn farming_mode(&self) -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    fn refresh_events(&self) -> broadcast::Receiver<()> {
        broadcast::channel(1).1
    }
}

struct TaggingPackager;

impl Packager<FixedSource> for TaggingPackager {
    fn postmaster(&self, character: &String) -> Value {
        json!(format!("postmaster:{character}"))
    }

    fn max_power(&self, character: &String, snapshot: &Value) -> Value {
        json!({ "character": character, "vault": snapshot["vault"] })
    }

    fn vault(&self, snapshot: &Value) -> Value {
        snapshot["vault"].clone()
    }

    fn metrics(&self, _snapshot: &Value) -> Value {
        Value::Null
    }

    fn equipped_items(&self, character: &String) -> Value {
        json!([format!("{character}-helmet")])
    }
}

/// **VALUE**: Each payload section comes from the matching packager method, fed
/// with the character and/or snapshot the contract promises.
///
/// **BUG THIS CATCHES**: Would catch swapped sections (e.g. vault data landing in
/// `maxPower`) that the deck would render in the wrong widget.
#[test]
fn given_packager_when_packaging_state_then_each_section_maps_to_its_method() {
    let source = FixedSource;
    let snapshot = source.snapshot();
    let character = source.current_character(&snapshot).unwrap();

    let payload = package_state::<FixedSource, _>(&TaggingPackager, &snapshot, &character);

    assert_eq!(payload.postmaster, json!("postmaster:warlock"));
    assert_eq!(payload.max_power, json!({ "character": "warlock", "vault": 42 }));
    assert_eq!(payload.vault, json!(42));
    assert_eq!(payload.metrics, Value::Null);
    assert_eq!(payload.equipped_items, json!(["warlock-helmet"]));
}

#[test]
fn given_any_flag_missing_when_checking_readiness_then_not_ready() {
    let partial = [
        Readiness {
            global_settings_loaded: false,
            ..Readiness::ready()
        },
        Readiness {
            reference_data_loaded: false,
            ..Readiness::ready()
        },
        Readiness {
            profile_loaded: false,
            ..Readiness::ready()
        },
    ];

    for readiness in partial {
        assert!(!readiness.is_ready(), "{readiness:?} should not be ready");
    }
    assert!(Readiness::ready().is_ready());
    assert!(!Readiness::default().is_ready());
}
