//! Test helpers for connection manager integration tests.
//!
//! - `FakeDeck`: a local WebSocket server standing in for the deck plugin
//! - `TestSource` / `TestPackager` / `RecordingDispatcher`: application side collaborators
//! - `spawn_test_manager`: wires a manager against a `FakeDeck` with short timings

use deck_core::auth::DeckAuth;
use deck_core::collaborators::{CommandDispatcher, Packager, Readiness, StateSource};
use deck_core::config::{EndpointConfig, SettingsSource, SharedSettings};
use deck_core::connection::{
    ConnectionStatus, DeckHandle, ManagerOptions, RetryPolicy, spawn_connection_manager,
};
use deck_core::protocol::InboundMessage;

use common::RedactedToken;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use backoff::backoff::Constant;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::{accept_async, accept_hdr_async};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

pub const TEST_INSTANCE: &str = "test-instance";
pub const TEST_TOKEN: &str = "test-token-12345";

pub const RETRY_DELAY: Duration = Duration::from_millis(50);
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);
const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================
// FAKE DECK
// ============================================

/// What the fake deck observed.
#[derive(Debug, Clone, PartialEq)]
pub enum DeckEvent {
    Connected { path: String },
    Received(Value),
    Disconnected,
}

enum DeckAction {
    Send(String),
    Close,
}

type ActionSlot = Arc<Mutex<Option<mpsc::UnboundedSender<DeckAction>>>>;

pub struct FakeDeck {
    pub port: u16,
    events: mpsc::UnboundedReceiver<DeckEvent>,
    latest: ActionSlot,
    connections: Arc<AtomicUsize>,
}

impl FakeDeck {
    /// Test helper: Start a deck server on an ephemeral local port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake deck");
        let port = listener.local_addr().expect("No local addr").port();

        let (event_tx, events) = mpsc::unbounded_channel();
        let latest: ActionSlot = Arc::new(Mutex::new(None));
        let connections = Arc::new(AtomicUsize::new(0));

        let accept_latest = latest.clone();
        let accept_connections = connections.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accept_connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve_connection(
                    stream,
                    event_tx.clone(),
                    accept_latest.clone(),
                ));
            }
        });

        Self {
            port,
            events,
            latest,
            connections,
        }
    }

    pub fn endpoint(&self) -> EndpointConfig {
        EndpointConfig {
            host: "127.0.0.1".to_string(),
            port: self.port,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Test helper: Push a text frame to the app over the most recent connection.
    pub fn send_to_app(&self, text: &str) {
        self.act(DeckAction::Send(text.to_string()));
    }

    /// Test helper: Close the most recent connection from the deck side.
    pub fn close_connection(&self) {
        self.act(DeckAction::Close);
    }

    fn act(&self, action: DeckAction) {
        let latest = self.latest.lock().expect("Action slot poisoned");
        latest
            .as_ref()
            .expect("No connection to act on")
            .send(action)
            .expect("Connection task is gone");
    }

    pub async fn next_event(&mut self) -> DeckEvent {
        tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
            .await
            .expect("Timed out waiting for deck event")
            .expect("Deck event channel closed")
    }

    /// Test helper: Wait for a connection and return its request path.
    pub async fn expect_connected(&mut self) -> String {
        match self.next_event().await {
            DeckEvent::Connected { path } => path,
            other => panic!("Expected connection, got {other:?}"),
        }
    }

    pub async fn expect_message(&mut self) -> Value {
        match self.next_event().await {
            DeckEvent::Received(value) => value,
            other => panic!("Expected message, got {other:?}"),
        }
    }

    pub async fn expect_disconnected(&mut self) {
        match self.next_event().await {
            DeckEvent::Disconnected => {}
            other => panic!("Expected disconnect, got {other:?}"),
        }
    }

    /// Test helper: Connect, then consume the initial `state` and `farmingMode` pushes.
    pub async fn expect_session_opened(&mut self) {
        self.expect_connected().await;
        assert_eq!(self.expect_message().await["action"], "state");
        assert_eq!(self.expect_message().await["action"], "farmingMode");
    }

    /// Test helper: Assert nothing happens on the deck for a while.
    pub async fn expect_quiet(&mut self, period: Duration) {
        if let Ok(Some(event)) = tokio::time::timeout(period, self.events.recv()).await {
            panic!("Expected no deck activity, got {event:?}");
        }
    }
}

async fn serve_connection(
    stream: tokio::net::TcpStream,
    events: mpsc::UnboundedSender<DeckEvent>,
    latest: ActionSlot,
) {
    let mut path = String::new();
    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        path = request.uri().path().to_string();
        Ok(response)
    };

    let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
        return;
    };

    let (action_tx, mut actions) = mpsc::unbounded_channel();
    *latest.lock().expect("Action slot poisoned") = Some(action_tx);
    let _ = events.send(DeckEvent::Connected { path });

    loop {
        tokio::select! {
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let value = serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
                    let _ = events.send(DeckEvent::Received(value));
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            Some(action) = actions.recv() => match action {
                DeckAction::Send(text) => {
                    let _ = ws.send(Message::Text(text.into())).await;
                }
                DeckAction::Close => {
                    let _ = ws.close(None).await;
                }
            },
        }
    }

    let _ = events.send(DeckEvent::Disconnected);
}

/// A deck that completes the handshake and then never reads.
///
/// Accepted sockets are held open so the app's writes back up once the
/// socket buffers fill.
pub struct StalledDeck {
    pub port: u16,
    connections: Arc<AtomicUsize>,
}

impl StalledDeck {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stalled deck");
        let port = listener.local_addr().expect("No local addr").port();
        let connections = Arc::new(AtomicUsize::new(0));

        let accept_connections = connections.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                if let Ok(ws) = accept_async(stream).await {
                    accept_connections.fetch_add(1, Ordering::SeqCst);
                    held.push(ws);
                }
            }
        });

        Self { port, connections }
    }

    pub fn endpoint(&self) -> EndpointConfig {
        EndpointConfig {
            host: "127.0.0.1".to_string(),
            port: self.port,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

// ============================================
// APPLICATION SIDE
// ============================================

#[derive(Debug)]
pub struct TestSnapshot {
    pub character: Option<String>,
    pub sequence: u64,
}

/// Application state that tests can flip at will.
pub struct TestSource {
    readiness: Mutex<Readiness>,
    character: Mutex<Option<String>>,
    snapshots: AtomicU64,
    farming_tx: watch::Sender<bool>,
    refresh_tx: broadcast::Sender<()>,
    farming_subscriptions: AtomicUsize,
}

impl TestSource {
    pub fn new() -> Self {
        let (farming_tx, _) = watch::channel(false);
        let (refresh_tx, _) = broadcast::channel(8);
        Self {
            readiness: Mutex::new(Readiness::ready()),
            character: Mutex::new(Some("hunter".to_string())),
            snapshots: AtomicU64::new(0),
            farming_tx,
            refresh_tx,
            farming_subscriptions: AtomicUsize::new(0),
        }
    }

    pub fn set_readiness(&self, readiness: Readiness) {
        *self.readiness.lock().expect("Readiness poisoned") = readiness;
    }

    pub fn set_character(&self, character: Option<&str>) {
        *self.character.lock().expect("Character poisoned") = character.map(str::to_string);
    }

    pub fn set_farming(&self, active: bool) {
        self.farming_tx.send_replace(active);
    }

    pub fn fire_refresh_event(&self) {
        self.refresh_tx.send(()).expect("No refresh observer installed");
    }

    pub fn farming_subscriptions(&self) -> usize {
        self.farming_subscriptions.load(Ordering::SeqCst)
    }
}

impl StateSource for TestSource {
    type Snapshot = TestSnapshot;
    type Character = String;

    fn readiness(&self) -> Readiness {
        *self.readiness.lock().expect("Readiness poisoned")
    }

    fn snapshot(&self) -> TestSnapshot {
        TestSnapshot {
            character: self.character.lock().expect("Character poisoned").clone(),
            sequence: self.snapshots.fetch_add(1, Ordering::SeqCst),
        }
    }

    fn current_character(&self, snapshot: &TestSnapshot) -> Option<String> {
        snapshot.character.clone()
    }

    fn character_id<'a>(&self, character: &'a String) -> &'a str {
        character
    }

    fn farming_mode(&self) -> watch::Receiver<bool> {
        self.farming_subscriptions.fetch_add(1, Ordering::SeqCst);
        self.farming_tx.subscribe()
    }

    fn refresh_events(&self) -> broadcast::Receiver<()> {
        self.refresh_tx.subscribe()
    }
}

pub struct TestPackager;

impl Packager<TestSource> for TestPackager {
    fn postmaster(&self, character: &String) -> Value {
        json!({ "character": character })
    }

    fn max_power(&self, _character: &String, snapshot: &TestSnapshot) -> Value {
        json!(snapshot.sequence)
    }

    fn vault(&self, _snapshot: &TestSnapshot) -> Value {
        json!({ "glimmer": 1000 })
    }

    fn metrics(&self, _snapshot: &TestSnapshot) -> Value {
        json!({})
    }

    fn equipped_items(&self, character: &String) -> Value {
        json!([format!("{character}-cloak")])
    }
}

/// Forwards every dispatched command, with the token it arrived under.
pub struct RecordingDispatcher {
    tx: mpsc::UnboundedSender<(InboundMessage, String)>,
}

impl CommandDispatcher for RecordingDispatcher {
    fn dispatch(&self, message: InboundMessage, token: &RedactedToken) {
        let _ = self.tx.send((message, token.as_str().to_string()));
    }
}

// ============================================
// WIRING
// ============================================

pub fn enabled_settings() -> SharedSettings {
    SharedSettings::new(
        true,
        Some(DeckAuth::new(TEST_INSTANCE, RedactedToken::new(TEST_TOKEN))),
    )
}

pub fn test_options(deck: &FakeDeck, refresh_interval: Duration) -> ManagerOptions {
    options_for(deck.endpoint(), refresh_interval)
}

pub fn options_for(endpoint: EndpointConfig, refresh_interval: Duration) -> ManagerOptions {
    ManagerOptions {
        endpoint,
        refresh_interval,
        retry_policy: RetryPolicy::new(Constant::new(RETRY_DELAY), Constant::new(RETRY_DELAY)),
    }
}

pub struct TestApp {
    pub handle: DeckHandle,
    pub settings: SharedSettings,
    pub source: Arc<TestSource>,
    pub dispatched: mpsc::UnboundedReceiver<(InboundMessage, String)>,
}

impl TestApp {
    pub async fn wait_for_status(&self, expected: ConnectionStatus) {
        let mut status = self.handle.subscribe_status();
        tokio::time::timeout(EVENT_TIMEOUT, status.wait_for(|s| *s == expected))
            .await
            .unwrap_or_else(|_| {
                panic!("Timed out waiting for {expected}, still {}", self.handle.status())
            })
            .expect("Manager stopped");
    }

    pub async fn next_dispatched(&mut self) -> (InboundMessage, String) {
        tokio::time::timeout(EVENT_TIMEOUT, self.dispatched.recv())
            .await
            .expect("Timed out waiting for dispatch")
            .expect("Dispatcher dropped")
    }
}

/// Test helper: Spawn a manager with a long refresh interval so only explicit
/// triggers push state.
pub fn spawn_test_manager(deck: &FakeDeck, settings: SharedSettings) -> TestApp {
    spawn_test_manager_with(settings, test_options(deck, Duration::from_secs(60)))
}

pub fn spawn_test_manager_with(settings: SharedSettings, options: ManagerOptions) -> TestApp {
    let source = Arc::new(TestSource::new());
    let (tx, dispatched) = mpsc::unbounded_channel();
    let settings_source: Arc<dyn SettingsSource> = Arc::new(settings.clone());

    let handle = spawn_connection_manager(
        settings_source,
        source.clone(),
        TestPackager,
        RecordingDispatcher { tx },
        options,
    );

    TestApp {
        handle,
        settings,
        source,
        dispatched,
    }
}
