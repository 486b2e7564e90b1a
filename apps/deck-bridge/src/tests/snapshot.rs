use crate::snapshot::{AppSnapshot, FileStateSource, SNAPSHOT_FILE_NAME};

use deck_core::collaborators::{Readiness, StateSource};

use serde_json::json;
use tempfile::TempDir;

const READY_SNAPSHOT: &str = r#"{
    "readiness": { "globalSettingsLoaded": true, "referenceDataLoaded": true, "profileLoaded": true },
    "farmingMode": true,
    "currentCharacterId": "2305843009",
    "characters": {
        "2305843009": { "postmaster": { "total": 4 }, "equippedItems": ["6917529"] },
        "2305843010": { "postmaster": { "total": 0 } }
    },
    "maxPower": { "2305843009": 2010 },
    "vault": { "glimmer": 250000 }
}"#;

fn source_with(contents: Option<&str>) -> (TempDir, FileStateSource) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(SNAPSHOT_FILE_NAME);
    if let Some(contents) = contents {
        std::fs::write(&path, contents).unwrap();
    }
    (dir, FileStateSource::new(path))
}

#[test]
fn given_current_character_id_when_resolving_then_character_carries_its_id() {
    let snapshot = AppSnapshot::parse(READY_SNAPSHOT).unwrap();

    let character = snapshot.current_character().unwrap();

    assert_eq!(character.id, "2305843009");
    assert_eq!(character.postmaster, json!({ "total": 4 }));
    assert_eq!(character.equipped_items, json!(["6917529"]));
}

/// **BUG THIS CATCHES**: Would catch the store id coming from anything but the
/// `characters` map key, which would report every equip on the current
/// character as an unequip.
#[test]
fn given_loaded_source_when_reading_character_id_then_matches_store_key() {
    let (_dir, source) = source_with(Some(READY_SNAPSHOT));
    source.reload().unwrap();

    let character = source.current_character(&source.snapshot()).unwrap();

    assert_eq!(source.character_id(&character), "2305843009");
}

#[test]
fn given_unknown_current_character_when_resolving_then_none() {
    let snapshot = AppSnapshot::parse(r#"{ "currentCharacterId": "missing" }"#).unwrap();

    assert!(snapshot.current_character().is_none());
}

/// **VALUE**: Until the host writes a snapshot, nothing reads as loaded.
///
/// **WHY THIS MATTERS**: The manager must keep waiting instead of pushing an
/// empty state to the deck.
#[test]
fn given_no_snapshot_file_when_reloading_then_not_ready() {
    let (_dir, source) = source_with(None);

    assert!(!source.reload().unwrap());
    assert_eq!(source.readiness(), Readiness::default());
    assert!(source.current_character(&source.snapshot()).is_none());
}

#[test]
fn given_snapshot_file_when_reloading_then_publishes_state() {
    let (_dir, source) = source_with(Some(READY_SNAPSHOT));
    let farming = source.farming_mode();
    let mut refresh = source.refresh_events();

    assert!(source.reload().unwrap());

    assert!(source.readiness().is_ready());
    assert!(*farming.borrow());
    assert!(refresh.try_recv().is_ok());
}

/// **BUG THIS CATCHES**: Would catch every poll emitting a refresh event,
/// which would push full state to the deck once per poll.
#[test]
fn given_unchanged_file_when_reloading_again_then_nothing_is_published() {
    let (_dir, source) = source_with(Some(READY_SNAPSHOT));
    assert!(source.reload().unwrap());
    let mut refresh = source.refresh_events();

    assert!(!source.reload().unwrap());

    assert!(refresh.try_recv().is_err());
}

#[test]
fn given_invalid_file_when_reloading_then_previous_snapshot_is_kept() {
    let (dir, source) = source_with(Some(READY_SNAPSHOT));
    source.reload().unwrap();

    std::fs::write(dir.path().join(SNAPSHOT_FILE_NAME), "{ truncated").unwrap();

    assert!(source.reload().is_err());
    assert!(!source.reload().unwrap());
    assert!(source.readiness().is_ready());
    assert_eq!(
        source.current_character(&source.snapshot()).unwrap().id,
        "2305843009"
    );
}

#[test]
fn given_farming_flag_unchanged_when_other_content_changes_then_no_farming_notification() {
    let (dir, source) = source_with(Some(READY_SNAPSHOT));
    source.reload().unwrap();
    let farming = source.farming_mode();

    let edited = READY_SNAPSHOT.replace("250000", "1");
    std::fs::write(dir.path().join(SNAPSHOT_FILE_NAME), edited).unwrap();
    assert!(source.reload().unwrap());

    assert!(!farming.has_changed().unwrap());
    assert_eq!(source.snapshot().vault, json!({ "glimmer": 1 }));
}
