use deck_bridge::dispatcher::{COMMAND_LOG_FILE_NAME, LoggingDispatcher};
use deck_bridge::packager::JsonPackager;
use deck_bridge::snapshot::{FileStateSource, SNAPSHOT_FILE_NAME};

use common::RedactedToken;

use deck_core::config::{
    AuthConfig, DeckConfig, EndpointConfig, FileSettings, SettingsSource, TimingConfig,
};
use deck_core::connection::{ManagerOptions, spawn_connection_manager};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};

const INSTANCE: &str = "bridge-test";
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

fn snapshot_json(farming_mode: bool) -> String {
    json!({
        "readiness": { "globalSettingsLoaded": true, "referenceDataLoaded": true, "profileLoaded": true },
        "farmingMode": farming_mode,
        "currentCharacterId": "c1",
        "characters": { "c1": { "postmaster": { "total": 2 }, "equippedItems": ["i1"] } },
        "maxPower": { "c1": 2010 },
        "vault": { "glimmer": 99 },
        "metrics": { "triumphs": 5 }
    })
    .to_string()
}

async fn accept_deck(listener: &TcpListener) -> (String, WebSocketStream<TcpStream>) {
    let (stream, _) = timeout(STEP_TIMEOUT, listener.accept())
        .await
        .expect("Bridge never connected")
        .unwrap();

    let mut path = String::new();
    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        path = request.uri().path().to_string();
        Ok(response)
    };
    let ws = accept_hdr_async(stream, callback).await.unwrap();

    (path, ws)
}

async fn next_json(ws: &mut WebSocketStream<TcpStream>) -> Value {
    loop {
        let frame = timeout(STEP_TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for bridge message")
            .expect("Bridge closed the connection")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn wait_for_command_file(path: &Path) -> Vec<Value> {
    let deadline = tokio::time::Instant::now() + STEP_TIMEOUT;
    loop {
        if let Ok(contents) = std::fs::read_to_string(path) {
            if !contents.is_empty() {
                return contents
                    .lines()
                    .map(|line| serde_json::from_str(line).unwrap())
                    .collect();
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "Command file never written"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// **VALUE**: Verifies the whole bridge against a deck: file settings, file
/// snapshot, JSON packager and command file wired through the manager.
///
/// **WHY THIS MATTERS**: Each piece has unit tests, but the deck only works if
/// the snapshot file's sections reach the wire under the right keys and deck
/// commands reach the file the host application tails.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - `deck.json` endpoint or instance is not honoured
/// - Snapshot edits do not reach the deck
/// - Inbound commands are not recorded
#[tokio::test]
async fn given_config_and_snapshot_when_bridge_runs_then_deck_mirrors_application() {
    // GIVEN: A deck listening locally and a config dir pointing at it
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let config_dir = tempfile::TempDir::new().unwrap();
    let config = DeckConfig {
        enabled: true,
        auth: Some(AuthConfig {
            instance: INSTANCE.to_string(),
            token: RedactedToken::new("bridge-token"),
        }),
        endpoint: EndpointConfig {
            host: "127.0.0.1".to_string(),
            port,
        },
        timing: TimingConfig {
            prerequisite_poll_ms: 20,
            reconnect_delay_ms: 50,
            refresh_interval_ms: 60_000,
        },
        ..DeckConfig::default()
    };
    config.save(config_dir.path()).unwrap();

    let snapshot_path = config_dir.path().join(SNAPSHOT_FILE_NAME);
    std::fs::write(&snapshot_path, snapshot_json(true)).unwrap();

    // WHEN: The bridge is wired up and started
    let source = Arc::new(FileStateSource::new(&snapshot_path));
    let poller = source
        .clone()
        .spawn_polling(config.timing.prerequisite_poll());
    let settings: Arc<dyn SettingsSource> = Arc::new(FileSettings::new(config_dir.path()));
    let command_path = config_dir.path().join(COMMAND_LOG_FILE_NAME);
    let deck = spawn_connection_manager(
        settings,
        source,
        JsonPackager,
        LoggingDispatcher::new(&command_path),
        ManagerOptions::from_config(&config),
    );
    deck.start().await.unwrap();

    // THEN: It connects on the instance path and pushes the snapshot
    let (path, mut ws) = accept_deck(&listener).await;
    assert_eq!(path, format!("/{INSTANCE}"));

    let state = next_json(&mut ws).await;
    assert_eq!(state["action"], "state");
    assert_eq!(
        state["data"],
        json!({
            "postmaster": { "total": 2 },
            "maxPower": 2010,
            "vault": { "glimmer": 99 },
            "metrics": { "triumphs": 5 },
            "equippedItems": ["i1"]
        })
    );
    assert_eq!(
        next_json(&mut ws).await,
        json!({ "action": "farmingMode", "data": true })
    );

    // WHEN: The host application turns farming mode off
    std::fs::write(&snapshot_path, snapshot_json(false)).unwrap();

    // THEN: The deck gets the new flag and a fresh state push
    let mut actions = vec![next_json(&mut ws).await, next_json(&mut ws).await];
    actions.sort_by_key(|m| m["action"].as_str().unwrap_or_default().to_string());
    assert_eq!(actions[0], json!({ "action": "farmingMode", "data": false }));
    assert_eq!(actions[1]["action"], "state");

    // WHEN: The deck sends a command
    ws.send(Message::Text(
        r#"{ "action": "search", "query": "is:dupe" }"#.into(),
    ))
    .await
    .unwrap();

    // THEN: It is recorded for the host application
    let commands = wait_for_command_file(&command_path).await;
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0]["action"], "search");
    assert_eq!(commands[0]["fields"]["query"], "is:dupe");

    deck.shutdown().await.unwrap();
    poller.abort();
}
