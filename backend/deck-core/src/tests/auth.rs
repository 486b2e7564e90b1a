use crate::auth::DeckAuth;
use crate::config::EndpointConfig;

use common::RedactedToken;

/// **VALUE**: Verifies the connect address is `ws://<host>:<port>/<instance>`.
///
/// **WHY THIS MATTERS**: The deck plugin routes connections by the path segment.
/// A wrong path means the deck never sees the application.
#[test]
fn given_default_endpoint_when_building_url_then_uses_instance_as_path() {
    // GIVEN: A credential and the default endpoint
    let auth = DeckAuth::new("abc123", RedactedToken::new("tok"));

    // WHEN: Building the endpoint URL
    let url = auth.endpoint_url(&EndpointConfig::default()).unwrap();

    // THEN: Local WebSocket on the fixed port with the instance as path
    assert_eq!(url.as_str(), "ws://localhost:9120/abc123");
}

/// **BUG THIS CATCHES**: Would catch if the instance id were spliced into the URL
/// as raw text, letting characters like spaces or `:` change the target.
#[test]
fn given_instance_with_reserved_characters_when_building_url_then_segment_is_encoded() {
    let auth = DeckAuth::new("my deck:1", RedactedToken::new("tok"));
    let endpoint = EndpointConfig {
        host: "127.0.0.1".to_string(),
        port: 4455,
    };

    let url = auth.endpoint_url(&endpoint).unwrap();

    assert_eq!(url.host_str(), Some("127.0.0.1"));
    assert_eq!(url.port(), Some(4455));
    assert_eq!(url.path(), "/my%20deck:1");
}

#[test]
fn given_credential_when_debug_formatted_then_token_is_hidden() {
    let auth = DeckAuth::new("abc123", RedactedToken::new("very-secret"));

    let debug = format!("{auth:?}");

    assert!(debug.contains("abc123"));
    assert!(!debug.contains("very-secret"));
}

#[test]
fn given_default_endpoint_when_building_url_then_matches_default_base_url() {
    let auth = DeckAuth::new("abc123", RedactedToken::new("tok"));

    let url = auth.endpoint_url(&EndpointConfig::default()).unwrap();

    assert_eq!(
        url.as_str(),
        format!("{}/abc123", crate::DECK_DEFAULT_BASE_URL)
    );
}
