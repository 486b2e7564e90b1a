use crate::paths::{APP_DIR_NAME, config_dir_from, log_dir_from};

use std::ffi::OsString;
use std::path::PathBuf;

#[test]
fn given_override_when_resolving_config_dir_then_override_wins() {
    let dir = config_dir_from(Some(OsString::from("/tmp/deck-config"))).unwrap();

    assert_eq!(dir, PathBuf::from("/tmp/deck-config"));
}

/// **BUG THIS CATCHES**: Would catch `DECK_BRIDGE_CONFIG_DIR=` (set but empty)
/// resolving to the working directory.
#[test]
fn given_empty_override_when_resolving_then_falls_back_to_platform_dir() {
    let Some(platform) = dirs::config_dir() else {
        return;
    };

    let dir = config_dir_from(Some(OsString::new())).unwrap();

    assert_eq!(dir, platform.join(APP_DIR_NAME));
}

#[test]
fn given_no_override_when_resolving_log_dir_then_nested_under_app_dir() {
    let Some(platform) = dirs::data_local_dir() else {
        return;
    };

    let dir = log_dir_from(None).unwrap();

    assert!(dir.starts_with(platform.join(APP_DIR_NAME)));
}
