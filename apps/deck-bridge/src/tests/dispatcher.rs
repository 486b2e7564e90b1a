use crate::dispatcher::{COMMAND_LOG_FILE_NAME, LoggingDispatcher};

use common::RedactedToken;

use deck_core::collaborators::CommandDispatcher;
use deck_core::protocol::decode;

use serde_json::Value;
use tempfile::TempDir;

fn read_lines(dispatcher: &LoggingDispatcher) -> Vec<Value> {
    std::fs::read_to_string(dispatcher.path())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// **VALUE**: Every dispatched command lands as one JSON line, in arrival order.
///
/// **WHY THIS MATTERS**: The host application applies commands by tailing this
/// file. Lost or merged lines mean lost deck button presses.
#[test]
fn given_commands_when_dispatched_then_appended_as_json_lines() {
    // GIVEN: An empty command file
    let dir = TempDir::new().unwrap();
    let dispatcher = LoggingDispatcher::new(dir.path().join(COMMAND_LOG_FILE_NAME));
    let token = RedactedToken::new("tok");

    // WHEN: Dispatching two commands
    dispatcher.dispatch(decode(r#"{ "action": "search", "query": "is:weapon" }"#).unwrap(), &token);
    dispatcher.dispatch(decode(r#"{ "action": "refresh" }"#).unwrap(), &token);

    // THEN: Two lines with action and fields
    let lines = read_lines(&dispatcher);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["action"], "search");
    assert_eq!(lines[0]["fields"]["query"], "is:weapon");
    assert!(lines[0]["receivedAt"].is_string());
    assert_eq!(lines[1]["action"], "refresh");
}

/// **BUG THIS CATCHES**: Would catch the session token leaking into the
/// command file that other local processes read.
#[test]
fn given_command_when_recorded_then_token_is_not_written() {
    let dir = TempDir::new().unwrap();
    let dispatcher = LoggingDispatcher::new(dir.path().join(COMMAND_LOG_FILE_NAME));

    dispatcher.dispatch(
        decode(r#"{ "action": "refresh" }"#).unwrap(),
        &RedactedToken::new("super-secret-token"),
    );

    let contents = std::fs::read_to_string(dispatcher.path()).unwrap();
    assert!(!contents.contains("super-secret-token"));
}

#[test]
fn given_unwritable_path_when_recording_then_returns_error() {
    let dir = TempDir::new().unwrap();
    let dispatcher = LoggingDispatcher::new(dir.path().join("missing").join(COMMAND_LOG_FILE_NAME));

    let result = dispatcher.record(&decode(r#"{ "action": "refresh" }"#).unwrap());

    assert!(result.is_err());
}
