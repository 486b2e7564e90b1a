use crate::connection::helpers::{
    DeckEvent, FakeDeck, QUIET_PERIOD, RETRY_DELAY, StalledDeck, TEST_INSTANCE, TEST_TOKEN,
    enabled_settings, options_for, spawn_test_manager, spawn_test_manager_with, test_options,
};

use deck_core::collaborators::Readiness;
use deck_core::config::SharedSettings;
use deck_core::connection::{ConnectionStatus, RetryPolicy};
use deck_core::protocol::OutboundMessage;

use std::time::Duration;

use backoff::backoff::{Constant, Stop};
use serde_json::json;

/// **VALUE**: Verifies the first thing the deck sees on a new connection is a full
/// `state` push followed by the current farming-mode flag.
///
/// **WHY THIS MATTERS**: The deck renders nothing until it has state. If the open
/// handler skips the initial push, the deck stays blank until the first timer tick.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The instance id is not used as the connection path
/// - The initial state push is skipped or sent after farming mode
/// - Packager sections land under the wrong keys
#[tokio::test]
async fn given_enabled_and_ready_when_start_then_pushes_state_then_farming_mode() {
    // GIVEN: A deck and an enabled, authenticated manager
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, enabled_settings());

    // WHEN: Starting
    app.handle.start().await.unwrap();

    // THEN: Connects on the instance path and pushes state, then farming mode
    assert_eq!(deck.expect_connected().await, format!("/{TEST_INSTANCE}"));

    let state = deck.expect_message().await;
    assert_eq!(state["action"], "state");
    assert_eq!(state["data"]["postmaster"], json!({ "character": "hunter" }));
    assert_eq!(state["data"]["equippedItems"], json!(["hunter-cloak"]));
    assert_eq!(state["data"]["vault"], json!({ "glimmer": 1000 }));

    let farming = deck.expect_message().await;
    assert_eq!(farming, json!({ "action": "farmingMode", "data": false }));

    app.wait_for_status(ConnectionStatus::Open).await;
}

/// **VALUE**: A disabled feature never opens a socket.
#[tokio::test]
async fn given_feature_disabled_when_start_then_never_connects() {
    let mut deck = FakeDeck::start().await;
    let settings = enabled_settings();
    settings.set_enabled(false);
    let app = spawn_test_manager(&deck, settings);

    app.handle.start().await.unwrap();

    deck.expect_quiet(QUIET_PERIOD).await;
    assert_eq!(deck.connection_count(), 0);
    assert_eq!(app.handle.status(), ConnectionStatus::Idle);
}

/// **BUG THIS CATCHES**: Would catch a missing credential being treated as a
/// failed connect, which would schedule reconnects forever.
#[tokio::test]
async fn given_no_credential_when_start_then_stays_idle_without_retrying() {
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, SharedSettings::new(true, None));

    app.handle.start().await.unwrap();

    deck.expect_quiet(QUIET_PERIOD).await;
    assert_eq!(deck.connection_count(), 0);
    assert_eq!(app.handle.status(), ConnectionStatus::Idle);
}

/// **VALUE**: Starting before application state has loaded waits, then connects
/// on its own once loading finishes.
///
/// **WHY THIS MATTERS**: The host calls start during boot. Without the poll the
/// deck would never connect on a cold start.
#[tokio::test]
async fn given_prerequisites_unmet_when_they_become_ready_then_connects() {
    // GIVEN: Profile still loading
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, enabled_settings());
    app.source.set_readiness(Readiness {
        profile_loaded: false,
        ..Readiness::ready()
    });

    // WHEN: Starting
    app.handle.start().await.unwrap();

    // THEN: Waits without connecting
    app.wait_for_status(ConnectionStatus::WaitingForPrerequisites)
        .await;
    deck.expect_quiet(QUIET_PERIOD).await;

    // WHEN: The profile finishes loading
    app.source.set_readiness(Readiness::ready());

    // THEN: Connects without another start
    deck.expect_session_opened().await;
    assert_eq!(deck.connection_count(), 1);
}

#[tokio::test]
async fn given_waiting_for_prerequisites_when_feature_disabled_then_never_connects() {
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, enabled_settings());
    app.source.set_readiness(Readiness::default());
    app.handle.start().await.unwrap();
    app.wait_for_status(ConnectionStatus::WaitingForPrerequisites)
        .await;

    app.settings.set_enabled(false);
    app.source.set_readiness(Readiness::ready());

    app.wait_for_status(ConnectionStatus::Idle).await;
    deck.expect_quiet(QUIET_PERIOD).await;
    assert_eq!(deck.connection_count(), 0);
}

/// **VALUE**: A second start replaces the connection instead of stacking a second one.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The first socket is left open (two connections pushing to one deck)
/// - The farming observer is re-installed and pushes its value again
#[tokio::test]
async fn given_open_connection_when_start_again_then_first_is_closed() {
    // GIVEN: An open session
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, enabled_settings());
    app.handle.start().await.unwrap();
    deck.expect_session_opened().await;

    // WHEN: Starting again
    app.handle.start().await.unwrap();

    // THEN: Old socket closes, new one opens and gets state only
    let mut events = Vec::new();
    for _ in 0..3 {
        events.push(deck.next_event().await);
    }
    assert!(events.contains(&DeckEvent::Disconnected), "{events:?}");
    assert!(
        events.contains(&DeckEvent::Connected {
            path: format!("/{TEST_INSTANCE}")
        }),
        "{events:?}"
    );
    assert!(
        events
            .iter()
            .any(|e| matches!(e, DeckEvent::Received(v) if v["action"] == "state")),
        "{events:?}"
    );

    deck.expect_quiet(QUIET_PERIOD).await;
    assert_eq!(deck.connection_count(), 2);
    assert_eq!(app.source.farming_subscriptions(), 1);
}

/// **BUG THIS CATCHES**: Would catch messages sent while closed being queued
/// and flushed on the next connect, delivering stale data.
#[tokio::test]
async fn given_not_open_when_send_then_message_is_dropped() {
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, enabled_settings());

    app.handle
        .send(OutboundMessage::FarmingMode(true))
        .await
        .unwrap();
    app.handle.start().await.unwrap();

    deck.expect_connected().await;
    assert_eq!(deck.expect_message().await["action"], "state");
    assert_eq!(
        deck.expect_message().await,
        json!({ "action": "farmingMode", "data": false })
    );
    deck.expect_quiet(QUIET_PERIOD).await;
}

#[tokio::test]
async fn given_open_when_send_equipment_status_then_deck_receives_it() {
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, enabled_settings());
    app.handle.start().await.unwrap();
    deck.expect_session_opened().await;

    app.handle.send_equipment_status("6917529", true).await.unwrap();

    assert_eq!(
        deck.expect_message().await,
        json!({
            "action": "equipmentStatus",
            "data": { "itemId": "6917529", "equipped": true }
        })
    );
}

/// **VALUE**: State is re-pushed on the refresh interval, and stop ends it.
///
/// **BUG THIS CATCHES**: Would catch the refresh timer surviving `stop`, which
/// would keep trying to push over a closed socket.
#[tokio::test]
async fn given_open_when_interval_elapses_then_state_is_pushed_until_stop() {
    // GIVEN: A short refresh interval
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager_with(
        enabled_settings(),
        test_options(&deck, Duration::from_millis(150)),
    );
    app.handle.start().await.unwrap();
    deck.expect_session_opened().await;

    // THEN: Further state pushes arrive on their own
    let first = deck.expect_message().await;
    let second = deck.expect_message().await;
    assert_eq!(first["action"], "state");
    assert_eq!(second["action"], "state");
    assert_ne!(first["data"]["maxPower"], second["data"]["maxPower"]);

    // WHEN: Stopping
    app.handle.stop().await.unwrap();

    // THEN: Socket closes and nothing more is sent
    loop {
        match deck.next_event().await {
            DeckEvent::Disconnected => break,
            DeckEvent::Received(value) => assert_eq!(value["action"], "state"),
            other => panic!("Unexpected {other:?}"),
        }
    }
    deck.expect_quiet(QUIET_PERIOD).await;
    assert_eq!(app.handle.status(), ConnectionStatus::Idle);
}

#[tokio::test]
async fn given_open_when_refresh_requested_then_state_is_pushed_immediately() {
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, enabled_settings());
    app.handle.start().await.unwrap();
    deck.expect_session_opened().await;

    app.handle.refresh().await.unwrap();

    assert_eq!(deck.expect_message().await["action"], "state");
}

#[tokio::test]
async fn given_open_when_application_reloads_then_state_is_pushed() {
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, enabled_settings());
    app.handle.start().await.unwrap();
    deck.expect_session_opened().await;

    app.source.fire_refresh_event();

    assert_eq!(deck.expect_message().await["action"], "state");
}

/// **VALUE**: When the deck drops the connection, the manager reconnects by itself.
///
/// **WHY THIS MATTERS**: The deck software restarts on updates. Users should
/// not have to toggle the feature to get the mirror back.
#[tokio::test]
async fn given_open_when_deck_closes_then_reconnects() {
    // GIVEN: An open session
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, enabled_settings());
    app.handle.start().await.unwrap();
    deck.expect_session_opened().await;

    // WHEN: The deck closes the socket
    deck.close_connection();
    deck.expect_disconnected().await;

    // THEN: A new connection opens and state is pushed again
    assert_eq!(deck.expect_connected().await, format!("/{TEST_INSTANCE}"));
    assert_eq!(deck.expect_message().await["action"], "state");
    app.wait_for_status(ConnectionStatus::Open).await;
    assert_eq!(deck.connection_count(), 2);
}

#[tokio::test]
async fn given_feature_disabled_when_deck_closes_then_does_not_reconnect() {
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, enabled_settings());
    app.handle.start().await.unwrap();
    deck.expect_session_opened().await;

    app.settings.set_enabled(false);
    deck.close_connection();
    deck.expect_disconnected().await;

    app.wait_for_status(ConnectionStatus::ClosedFinal).await;
    deck.expect_quiet(QUIET_PERIOD).await;
    assert_eq!(deck.connection_count(), 1);
}

#[tokio::test]
async fn given_reconnect_budget_exhausted_when_deck_closes_then_closed_final() {
    let mut deck = FakeDeck::start().await;
    let mut options = test_options(&deck, Duration::from_secs(60));
    options.retry_policy = RetryPolicy::new(Constant::new(RETRY_DELAY), Stop {});
    let app = spawn_test_manager_with(enabled_settings(), options);
    app.handle.start().await.unwrap();
    deck.expect_session_opened().await;

    deck.close_connection();
    deck.expect_disconnected().await;

    app.wait_for_status(ConnectionStatus::ClosedFinal).await;
    deck.expect_quiet(QUIET_PERIOD).await;
    assert_eq!(deck.connection_count(), 1);
}

/// **BUG THIS CATCHES**: Would catch `stop` leaving a scheduled reconnect in
/// place, so the socket reopens after the user asked for it to close.
#[tokio::test]
async fn given_reconnect_pending_when_stop_then_reconnect_is_cancelled() {
    let mut deck = FakeDeck::start().await;
    let mut options = test_options(&deck, Duration::from_secs(60));
    options.retry_policy = RetryPolicy::new(
        Constant::new(RETRY_DELAY),
        Constant::new(Duration::from_millis(250)),
    );
    let app = spawn_test_manager_with(enabled_settings(), options);
    app.handle.start().await.unwrap();
    deck.expect_session_opened().await;

    deck.close_connection();
    deck.expect_disconnected().await;
    app.wait_for_status(ConnectionStatus::ClosedWillRetry).await;

    app.handle.stop().await.unwrap();

    deck.expect_quiet(Duration::from_millis(500)).await;
    assert_eq!(deck.connection_count(), 1);
    assert_eq!(app.handle.status(), ConnectionStatus::Idle);
}

/// **VALUE**: Turning the feature off while a reconnect is pending ends the
/// lifecycle instead of reopening the socket.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The scheduled reconnect ignores the enabled flag and connects anyway
/// - An abandoned reconnect reports `Idle`, which reads as "never started"
#[tokio::test]
async fn given_reconnect_pending_when_feature_disabled_then_closed_final_without_connecting() {
    // GIVEN: A dropped connection with a reconnect scheduled
    let mut deck = FakeDeck::start().await;
    let mut options = test_options(&deck, Duration::from_secs(60));
    options.retry_policy = RetryPolicy::new(
        Constant::new(RETRY_DELAY),
        Constant::new(Duration::from_millis(250)),
    );
    let app = spawn_test_manager_with(enabled_settings(), options);
    app.handle.start().await.unwrap();
    deck.expect_session_opened().await;

    deck.close_connection();
    deck.expect_disconnected().await;
    app.wait_for_status(ConnectionStatus::ClosedWillRetry).await;

    // WHEN: The user turns the feature off before the reconnect fires
    app.settings.set_enabled(false);

    // THEN: The reconnect gives up without touching the deck
    app.wait_for_status(ConnectionStatus::ClosedFinal).await;
    deck.expect_quiet(Duration::from_millis(500)).await;
    assert_eq!(deck.connection_count(), 1);
    assert_eq!(app.handle.status(), ConnectionStatus::ClosedFinal);
}

/// **BUG THIS CATCHES**: Would catch an endpoint that cannot form a URL being
/// retried, or leaving the manager stuck in `Connecting`.
#[tokio::test]
async fn given_invalid_endpoint_host_when_start_then_closed_final_without_connecting() {
    let mut deck = FakeDeck::start().await;
    let mut options = test_options(&deck, Duration::from_secs(60));
    options.endpoint.host = "bad host".to_string();
    let app = spawn_test_manager_with(enabled_settings(), options);

    app.handle.start().await.unwrap();

    app.wait_for_status(ConnectionStatus::ClosedFinal).await;
    deck.expect_quiet(QUIET_PERIOD).await;
    assert_eq!(deck.connection_count(), 0);
}

/// **VALUE**: A deck that accepts the connection but never reads cannot wedge
/// the manager.
///
/// **WHY THIS MATTERS**: A hung plugin would otherwise make `stop` and
/// `shutdown` hang the host with it.
///
/// **BUG THIS CATCHES**: Would catch socket writes awaited on the manager
/// loop, or an unbounded backlog of state pushes.
#[tokio::test]
async fn given_deck_never_reads_when_pushing_large_state_then_stop_still_completes() {
    // GIVEN: An open session to a deck that never reads, with a large payload
    let deck = StalledDeck::start().await;
    let app = spawn_test_manager_with(
        enabled_settings(),
        options_for(deck.endpoint(), Duration::from_secs(60)),
    );
    app.source.set_character(Some("x".repeat(2 << 20).as_str()));
    app.handle.start().await.unwrap();
    app.wait_for_status(ConnectionStatus::Open).await;

    // WHEN: Pushing state repeatedly, then stopping
    for _ in 0..20 {
        app.handle.refresh().await.unwrap();
    }
    let stopped = tokio::time::timeout(Duration::from_secs(5), app.handle.stop()).await;

    // THEN: Stop completes promptly
    assert!(stopped.is_ok(), "stop hung behind a stalled deck");
    stopped.unwrap().unwrap();
    assert_eq!(app.handle.status(), ConnectionStatus::Idle);
    assert_eq!(deck.connection_count(), 1);
}

#[tokio::test]
async fn given_zero_refresh_interval_when_start_then_session_opens() {
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager_with(enabled_settings(), test_options(&deck, Duration::ZERO));

    app.handle.start().await.unwrap();

    deck.expect_session_opened().await;
    app.wait_for_status(ConnectionStatus::Open).await;
    app.handle.refresh().await.unwrap();
    assert_eq!(deck.expect_message().await["action"], "state");
}

/// **VALUE**: An item moved into the current character's store reports as
/// equipped; any other store reports as unequipped.
#[tokio::test]
async fn given_open_when_equipment_moves_then_equipped_follows_current_character() {
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, enabled_settings());
    app.handle.start().await.unwrap();
    deck.expect_session_opened().await;

    app.handle
        .send_equipment_location("6917529", "hunter")
        .await
        .unwrap();
    app.handle
        .send_equipment_location("6917529", "warlock")
        .await
        .unwrap();

    assert_eq!(
        deck.expect_message().await,
        json!({
            "action": "equipmentStatus",
            "data": { "itemId": "6917529", "equipped": true }
        })
    );
    assert_eq!(
        deck.expect_message().await,
        json!({
            "action": "equipmentStatus",
            "data": { "itemId": "6917529", "equipped": false }
        })
    );
}

#[tokio::test]
async fn given_deck_unreachable_when_retries_exhausted_then_closed_final() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let deck = FakeDeck::start().await;
    let mut options = test_options(&deck, Duration::from_secs(60));
    options.endpoint.port = port;
    options.retry_policy = RetryPolicy::new(Constant::new(RETRY_DELAY), Stop {});
    let app = spawn_test_manager_with(enabled_settings(), options);

    app.handle.start().await.unwrap();

    app.wait_for_status(ConnectionStatus::ClosedFinal).await;
}

/// **VALUE**: Deck commands reach the dispatcher with the token of the
/// connection they arrived on.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Malformed frames tear down the connection
/// - Malformed frames reach the dispatcher
/// - The dispatcher gets a token other than the session's
#[tokio::test]
async fn given_open_when_deck_sends_commands_then_valid_ones_are_dispatched() {
    // GIVEN: An open session
    let mut deck = FakeDeck::start().await;
    let mut app = spawn_test_manager(&deck, enabled_settings());
    app.handle.start().await.unwrap();
    deck.expect_session_opened().await;

    // WHEN: The deck sends garbage, then a real command
    deck.send_to_app("not json");
    deck.send_to_app(r#"{ "item": "missing action" }"#);
    deck.send_to_app(r#"{ "action": "equipItem", "item": "123" }"#);

    // THEN: Only the real command is dispatched, with the session token
    let (message, token) = app.next_dispatched().await;
    assert_eq!(message.action, "equipItem");
    assert_eq!(message.field("item"), Some(&json!("123")));
    assert_eq!(token, TEST_TOKEN);

    // THEN: The connection is still up
    deck.expect_quiet(QUIET_PERIOD).await;
    assert_eq!(app.handle.status(), ConnectionStatus::Open);
    assert!(app.dispatched.try_recv().is_err());
}

/// **VALUE**: Farming-mode changes are pushed as they happen, and the observer
/// is installed only once across reconnects.
#[tokio::test]
async fn given_open_when_farming_mode_changes_then_change_is_pushed() {
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, enabled_settings());
    app.handle.start().await.unwrap();
    deck.expect_session_opened().await;

    app.source.set_farming(true);
    assert_eq!(
        deck.expect_message().await,
        json!({ "action": "farmingMode", "data": true })
    );

    deck.close_connection();
    deck.expect_disconnected().await;
    deck.expect_connected().await;
    assert_eq!(deck.expect_message().await["action"], "state");

    app.source.set_farming(false);
    assert_eq!(
        deck.expect_message().await,
        json!({ "action": "farmingMode", "data": false })
    );
    assert_eq!(app.source.farming_subscriptions(), 1);
}

#[tokio::test]
async fn given_no_current_character_when_refreshing_then_no_state_is_sent() {
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, enabled_settings());
    app.source.set_character(None);

    app.handle.start().await.unwrap();

    deck.expect_connected().await;
    assert_eq!(deck.expect_message().await["action"], "farmingMode");

    app.handle.refresh().await.unwrap();
    deck.expect_quiet(QUIET_PERIOD).await;
}

#[tokio::test]
async fn given_shutdown_when_using_handle_then_manager_stopped() {
    let mut deck = FakeDeck::start().await;
    let app = spawn_test_manager(&deck, enabled_settings());
    app.handle.start().await.unwrap();
    deck.expect_session_opened().await;

    app.handle.shutdown().await.unwrap();

    deck.expect_disconnected().await;
    assert!(app.handle.start().await.is_err());
}
