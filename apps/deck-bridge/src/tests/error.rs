// Unit tests for error module

use crate::error::BridgeError;

use deck_core::error::config::ConfigError;

/// **VALUE**: Tests that errors serialize with their variant and call site.
///
/// **WHY THIS MATTERS**: The host application reads bridge errors back as JSON.
/// If serialization breaks, it only sees opaque strings.
///
/// **BUG THIS CATCHES**: Would catch if someone removes the `#[derive(Serialize)]`
/// or adds a non-serializable field.
#[test]
fn given_bridge_error_when_serialized_then_contains_type_and_data() {
    // GIVEN: A BridgeError
    let err = BridgeError::snapshot("Test");

    // WHEN: Serializing to JSON
    let json: serde_json::Value = serde_json::to_value(&err).unwrap();

    // THEN: Tagged with the variant, data carries message and location
    assert_eq!(json["type"], "Snapshot");
    assert_eq!(json["data"]["message"], "Test");
    assert!(
        json["data"]["location"]["file"]
            .as_str()
            .unwrap()
            .ends_with("error.rs")
    );
}

#[test]
fn given_config_error_when_converted_then_becomes_core_error() {
    let err: BridgeError = ConfigError::validation("endpoint.port cannot be 0").into();

    assert!(matches!(err, BridgeError::Core { .. }));
    assert!(err.to_string().contains("endpoint.port cannot be 0"));
}
