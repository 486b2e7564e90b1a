use crate::config::{AuthConfig, CONFIG_FILE_NAME, DeckConfig, EndpointConfig, TimingConfig};
use crate::error::config::ConfigError;

use common::RedactedToken;

use std::time::Duration;

use tempfile::TempDir;

fn config_with_auth(instance: &str, token: &str) -> DeckConfig {
    DeckConfig {
        enabled: true,
        auth: Some(AuthConfig {
            instance: instance.to_string(),
            token: RedactedToken::new(token),
        }),
        ..DeckConfig::default()
    }
}

/// **VALUE**: A first run with no config file must not fail.
///
/// **WHY THIS MATTERS**: The bridge starts before the user has ever paired a
/// deck. Defaults mean "feature off", which keeps the manager idle.
#[test]
fn given_missing_file_when_loading_then_returns_disabled_defaults() {
    let dir = TempDir::new().unwrap();

    let config = DeckConfig::load(dir.path()).unwrap();

    assert!(!config.enabled);
    assert!(config.auth.is_none());
    assert_eq!(config.endpoint, EndpointConfig::default());
    assert_eq!(config.endpoint.port, 9120);
    assert_eq!(config.timing, TimingConfig::default());
}

/// **VALUE**: The token written by `save` is the real token, and `load` reads it back.
///
/// **BUG THIS CATCHES**: `RedactedToken` refuses plain serde serialization. Would
/// catch the config writer falling back to that path and losing the credential.
#[test]
fn given_saved_credential_when_loading_then_token_survives() {
    let dir = TempDir::new().unwrap();
    config_with_auth("abc123", "secret-token").save(dir.path()).unwrap();

    let loaded = DeckConfig::load(dir.path()).unwrap();
    let auth = loaded.deck_auth().unwrap();

    assert!(loaded.enabled);
    assert_eq!(auth.instance(), "abc123");
    assert_eq!(auth.token().as_str(), "secret-token");
    assert!(!dir.path().join(format!("{CONFIG_FILE_NAME}.tmp")).exists());
}

#[test]
fn given_partial_file_when_loading_then_missing_sections_take_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"{ "enabled": true, "timing": { "refresh_interval_ms": 5000 } }"#,
    )
    .unwrap();

    let config = DeckConfig::load(dir.path()).unwrap();

    assert!(config.enabled);
    assert_eq!(config.timing.refresh_interval(), Duration::from_secs(5));
    assert_eq!(config.timing.reconnect_delay(), Duration::from_millis(2_500));
    assert_eq!(config.timing.prerequisite_poll(), Duration::from_secs(1));
}

#[test]
fn given_corrupt_file_when_loading_then_returns_parse_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();

    let result = DeckConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **BUG THIS CATCHES**: An instance id containing `/` would be split into
/// several path segments and reach a different deck route.
#[test]
fn given_instance_with_url_delimiter_when_validating_then_rejected() {
    for instance in ["a/b", "a?b", "a#b", ""] {
        let config = config_with_auth(instance, "tok");

        let result = config.validate();

        assert!(
            matches!(result, Err(ConfigError::ValidationError { .. })),
            "instance {instance:?} should be rejected"
        );
    }
}

#[test]
fn given_empty_token_when_saving_then_nothing_is_written() {
    let dir = TempDir::new().unwrap();

    let result = config_with_auth("abc123", "").save(dir.path());

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    assert!(!dir.path().join(CONFIG_FILE_NAME).exists());
}

#[test]
fn given_zero_timing_when_validating_then_rejected() {
    let config = DeckConfig {
        timing: TimingConfig {
            reconnect_delay_ms: 0,
            ..TimingConfig::default()
        },
        ..DeckConfig::default()
    };

    let err = config.validate().unwrap_err();

    assert!(err.to_string().contains("reconnect_delay_ms"));
}

#[test]
fn given_future_version_when_loading_then_returns_validation_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{ "version": 99 }"#).unwrap();

    let result = DeckConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}
