use crate::logger::{DEFAULT_LOG_LEVEL, LOG_FILE_NAME, initialize, level_from};

use log::LevelFilter;
use tempfile::TempDir;

/// **VALUE**: A second initialization is harmless.
///
/// **BUG THIS CATCHES**: Would catch the install guard being removed, so the
/// second call fails because fern cannot set the global logger twice.
#[test]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A valid temporary directory
    let temp_dir = TempDir::new().unwrap();

    // WHEN: Initializing twice, the second time at another level
    let first = initialize(temp_dir.path(), LevelFilter::Debug);
    let second = initialize(temp_dir.path(), LevelFilter::Trace);

    // THEN: Both succeed and the log file exists
    assert!(first.is_ok(), "First initialization should succeed");
    assert!(second.is_ok(), "Second initialization should be a no-op");
    assert!(temp_dir.path().join(LOG_FILE_NAME).exists());
}

#[test]
fn given_level_name_when_parsing_then_case_and_padding_are_ignored() {
    assert_eq!(level_from(Some("warn")), LevelFilter::Warn);
    assert_eq!(level_from(Some(" TRACE ")), LevelFilter::Trace);
    assert_eq!(level_from(Some("off")), LevelFilter::Off);
}

/// **BUG THIS CATCHES**: Would catch a typo in the environment silencing all
/// logging instead of falling back.
#[test]
fn given_missing_or_unknown_level_when_parsing_then_default_level() {
    assert_eq!(level_from(None), DEFAULT_LOG_LEVEL);
    assert_eq!(level_from(Some("verbose")), DEFAULT_LOG_LEVEL);
    assert_eq!(level_from(Some("")), DEFAULT_LOG_LEVEL);
}
