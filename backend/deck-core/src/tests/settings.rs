use crate::auth::DeckAuth;
use crate::config::{AuthConfig, CONFIG_FILE_NAME, DeckConfig, FileSettings, SettingsSource, SharedSettings};

use common::RedactedToken;

use tempfile::TempDir;

/// **VALUE**: File-backed settings pick up edits without a restart.
///
/// **WHY THIS MATTERS**: The manager re-checks the enabled flag on every start
/// attempt and close. Turning the feature off in the file must stop reconnects.
#[test]
fn given_file_edited_when_querying_again_then_new_values_are_seen() {
    let dir = TempDir::new().unwrap();
    let settings = FileSettings::new(dir.path());
    assert!(!settings.enabled());
    assert!(settings.auth().is_none());

    DeckConfig {
        enabled: true,
        auth: Some(AuthConfig {
            instance: "abc123".to_string(),
            token: RedactedToken::new("tok"),
        }),
        ..DeckConfig::default()
    }
    .save(dir.path())
    .unwrap();

    assert!(settings.enabled());
    assert_eq!(settings.auth().unwrap().instance(), "abc123");
}

#[test]
fn given_corrupt_file_when_querying_then_reads_as_disabled() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "garbage").unwrap();
    let settings = FileSettings::new(dir.path());

    assert!(!settings.enabled());
    assert!(settings.auth().is_none());
}

#[test]
fn given_shared_settings_when_clone_is_updated_then_original_sees_change() {
    let settings = SharedSettings::default();
    let clone = settings.clone();

    clone.set_enabled(true);
    clone.set_auth(Some(DeckAuth::new("abc123", RedactedToken::new("tok"))));

    assert!(settings.enabled());
    assert_eq!(settings.auth().unwrap().instance(), "abc123");

    clone.set_auth(None);
    assert!(settings.auth().is_none());
}
