use crate::snapshot::{AppSnapshot, CharacterSnapshot, FileStateSource};

use deck_core::collaborators::Packager;

use std::sync::Arc;

use serde_json::Value;

/// Lifts each `state` section straight out of the snapshot file.
///
/// Sections the host did not write go out as `null`.
pub struct JsonPackager;

impl Packager<FileStateSource> for JsonPackager {
    fn postmaster(&self, character: &CharacterSnapshot) -> Value {
        character.postmaster.clone()
    }

    fn max_power(&self, character: &CharacterSnapshot, snapshot: &Arc<AppSnapshot>) -> Value {
        snapshot
            .max_power
            .get(&character.id)
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn vault(&self, snapshot: &Arc<AppSnapshot>) -> Value {
        snapshot.vault.clone()
    }

    fn metrics(&self, snapshot: &Arc<AppSnapshot>) -> Value {
        snapshot.metrics.clone()
    }

    fn equipped_items(&self, character: &CharacterSnapshot) -> Value {
        character.equipped_items.clone()
    }
}
