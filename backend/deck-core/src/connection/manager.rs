//! The connection manager actor.
//!
//! One task owns the deck connection, the refresh timer and the retry
//! schedule. Handle commands, transport reports, timer ticks and state
//! observer notifications are all events on a single `select!` loop, so they
//! are processed strictly one at a time. Handlers never await: socket I/O
//! lives in the transport task.

use crate::auth::DeckAuth;
use crate::collaborators::{CommandDispatcher, Packager, StateSource, package_state};
use crate::config::{DeckConfig, EndpointConfig, SettingsSource, TimingConfig};
use crate::connection::handle::DeckHandle;
use crate::connection::retry::RetryPolicy;
use crate::connection::status::ConnectionStatus;
use crate::connection::transport::{TransportEvent, TransportReport, spawn_connection};
use crate::protocol::{self, EquipmentStatus, OutboundMessage};

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};

const COMMAND_CHANNEL_CAPACITY: usize = 100;
const TRANSPORT_CHANNEL_CAPACITY: usize = 100;

pub(crate) enum Command {
    Start,
    Stop(oneshot::Sender<()>),
    Send(OutboundMessage),
    /// An item moved to `store_id`; equipped if that is the current character.
    EquipmentMoved {
        item_id: String,
        store_id: String,
    },
    Refresh,
    Shutdown(oneshot::Sender<()>),
}

/// Endpoint, refresh period and retry schedule for one manager.
pub struct ManagerOptions {
    pub endpoint: EndpointConfig,
    /// A zero interval is replaced by the default.
    pub refresh_interval: Duration,
    pub retry_policy: RetryPolicy,
}

impl ManagerOptions {
    pub fn from_config(config: &DeckConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            refresh_interval: config.timing.refresh_interval(),
            retry_policy: RetryPolicy::fixed(&config.timing),
        }
    }
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self::from_config(&DeckConfig::default())
    }
}

/// Spawn the connection manager on the current tokio runtime.
///
/// The manager starts `Idle`; nothing connects until [`DeckHandle::start`]
/// is called.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn spawn_connection_manager<S, P, D>(
    settings: Arc<dyn SettingsSource>,
    source: Arc<S>,
    packager: P,
    dispatcher: D,
    options: ManagerOptions,
) -> DeckHandle
where
    S: StateSource,
    P: Packager<S>,
    D: CommandDispatcher,
{
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (report_tx, report_rx) = mpsc::channel(TRANSPORT_CHANNEL_CAPACITY);
    let (status_tx, status_rx) = watch::channel(ConnectionStatus::Idle);

    let refresh_period = if options.refresh_interval.is_zero() {
        let fallback = TimingConfig::default().refresh_interval();
        warn!("Deck refresh interval cannot be zero, using {fallback:?}");
        fallback
    } else {
        options.refresh_interval
    };

    let manager = Manager {
        settings,
        source,
        packager,
        dispatcher,
        endpoint: options.endpoint,
        refresh_period,
        retry: options.retry_policy,
        status_tx,
        report_tx,
        generation: 0,
        session: None,
        refresh_timer: None,
        next_attempt: None,
        farming_observer_installed: false,
        farming_mode: None,
        refresh_observer_installed: false,
        refresh_events: None,
    };

    tokio::spawn(manager.run(command_rx, report_rx));
    info!("Deck connection manager spawned");

    DeckHandle::new(command_tx, status_rx)
}

/// What triggered a pass of the start logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptOrigin {
    /// `DeckHandle::start`, or a prerequisite poll it scheduled.
    Start,
    /// The reconnect chain, or a prerequisite poll it scheduled.
    Reconnect,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledAttempt {
    at: Instant,
    origin: AttemptOrigin,
}

/// The live (or connecting) transport and the credential it was opened with.
struct Session {
    generation: u64,
    auth: DeckAuth,
    outbox: mpsc::Sender<String>,
    task: JoinHandle<()>,
    /// `false` until the handshake completes.
    open: bool,
}

struct Manager<S, P, D> {
    settings: Arc<dyn SettingsSource>,
    source: Arc<S>,
    packager: P,
    dispatcher: D,
    endpoint: EndpointConfig,
    refresh_period: Duration,
    retry: RetryPolicy,
    status_tx: watch::Sender<ConnectionStatus>,
    report_tx: mpsc::Sender<TransportReport>,

    generation: u64,
    session: Option<Session>,
    refresh_timer: Option<Interval>,
    next_attempt: Option<ScheduledAttempt>,

    farming_observer_installed: bool,
    farming_mode: Option<watch::Receiver<bool>>,
    refresh_observer_installed: bool,
    refresh_events: Option<broadcast::Receiver<()>>,
}

impl<S, P, D> Manager<S, P, D>
where
    S: StateSource,
    P: Packager<S>,
    D: CommandDispatcher,
{
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut reports: mpsc::Receiver<TransportReport>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let keep_running = match command {
                        Some(command) => self.handle_command(command),
                        None => {
                            self.stop();
                            false
                        }
                    };
                    if !keep_running {
                        break;
                    }
                }
                Some(report) = reports.recv() => self.handle_report(report),
                origin = sleep_until_deadline(self.next_attempt) => self.attempt_start(origin),
                _ = tick(&mut self.refresh_timer) => self.refresh_cycle(),
                farming = farming_changed(&mut self.farming_mode) => match farming {
                    Some(active) => self.send(OutboundMessage::FarmingMode(active)),
                    None => {
                        debug!("Farming mode source closed, observer detached");
                        self.farming_mode = None;
                    }
                },
                signal = refresh_signal(&mut self.refresh_events) => match signal {
                    Ok(()) | Err(RecvError::Lagged(_)) => self.refresh_now(),
                    Err(RecvError::Closed) => {
                        debug!("Refresh event source closed, observer detached");
                        self.refresh_events = None;
                    }
                },
            }
        }

        info!("Deck connection manager stopped");
    }

    /// Returns `false` once the manager should exit.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Start => {
                debug!("Deck start requested");
                self.attempt_start(AttemptOrigin::Start);
            }
            Command::Stop(ack) => {
                self.stop();
                let _ = ack.send(());
            }
            Command::Send(message) => self.send(message),
            Command::EquipmentMoved { item_id, store_id } => {
                let equipped = self.is_current_character(&store_id);
                self.send(OutboundMessage::EquipmentStatus(EquipmentStatus {
                    item_id,
                    equipped,
                }));
            }
            Command::Refresh => self.refresh_now(),
            Command::Shutdown(ack) => {
                self.stop();
                let _ = ack.send(());
                return false;
            }
        }
        true
    }

    /// One pass of the start logic. Re-entered by both retry chains.
    fn attempt_start(&mut self, origin: AttemptOrigin) {
        // Whatever was scheduled is superseded by this pass.
        self.next_attempt = None;

        if !self.source.readiness().is_ready() {
            if !self.settings.enabled() {
                debug!("Deck feature disabled while waiting for application state");
                self.abandon_attempt(origin);
                return;
            }

            match self.retry.next_prerequisite_poll() {
                Some(delay) => {
                    trace!("Application state not loaded, polling again in {delay:?}");
                    self.schedule_attempt(delay, origin);
                    self.set_status(ConnectionStatus::WaitingForPrerequisites);
                }
                None => {
                    warn!("Gave up waiting for application state");
                    self.set_status(ConnectionStatus::ClosedFinal);
                }
            }
            return;
        }

        if !self.settings.enabled() {
            debug!("Deck feature disabled, not connecting");
            self.abandon_attempt(origin);
            return;
        }

        let Some(auth) = self.settings.auth() else {
            debug!("No deck credential configured, not connecting");
            self.abandon_attempt(origin);
            return;
        };

        self.install_refresh_observer();

        let url = match auth.endpoint_url(&self.endpoint) {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot build deck endpoint: {e}");
                self.close_session();
                self.set_status(ConnectionStatus::ClosedFinal);
                return;
            }
        };

        self.close_session();

        self.generation += 1;
        info!("Connecting to deck at {url} (connection {})", self.generation);

        let transport = spawn_connection(self.generation, url, self.report_tx.clone());
        self.session = Some(Session {
            generation: self.generation,
            auth,
            outbox: transport.outbox,
            task: transport.task,
            open: false,
        });
        self.set_status(ConnectionStatus::Connecting);
    }

    /// The feature is off or has no credential.
    ///
    /// A reconnect that finds this ends the lifecycle; an explicit start
    /// leaves any open connection alone.
    fn abandon_attempt(&mut self, origin: AttemptOrigin) {
        match origin {
            AttemptOrigin::Reconnect => self.set_status(ConnectionStatus::ClosedFinal),
            AttemptOrigin::Start => {
                if self.session.is_none() {
                    self.set_status(ConnectionStatus::Idle);
                }
            }
        }
    }

    fn schedule_attempt(&mut self, delay: Duration, origin: AttemptOrigin) {
        self.next_attempt = Some(ScheduledAttempt {
            at: Instant::now() + delay,
            origin,
        });
    }

    fn stop(&mut self) {
        self.next_attempt = None;
        self.close_session();
        self.set_status(ConnectionStatus::Idle);
        info!("Deck connection stopped");
    }

    fn handle_report(&mut self, report: TransportReport) {
        let current = self
            .session
            .as_ref()
            .is_some_and(|session| session.generation == report.generation);

        if !current {
            trace!(
                "Ignoring {} from superseded deck connection {}",
                report.event.kind(),
                report.generation
            );
            return;
        }

        match report.event {
            TransportEvent::Opened => self.on_open(),
            TransportEvent::Message(text) => self.on_message(&text),
            TransportEvent::Closed => self.on_close(),
        }
    }

    fn on_open(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.open = true;
        }

        info!("Deck connection {} open", self.generation);
        self.set_status(ConnectionStatus::Open);
        self.retry.reset();

        self.refresh_cycle();
        self.restart_refresh_timer();
        self.install_farming_observer();
    }

    fn on_message(&self, text: &str) {
        let Some(session) = self.session.as_ref() else {
            return;
        };

        match protocol::decode(text) {
            Ok(message) => {
                debug!("Deck command received: {}", message.action);
                self.dispatcher.dispatch(message, session.auth.token());
            }
            Err(e) => warn!("Dropping malformed deck message: {e}"),
        }
    }

    /// Transport is gone. Reconnect later if the user still wants the feature.
    fn on_close(&mut self) {
        if let Some(session) = self.session.take() {
            session.task.abort();
        }
        self.refresh_timer = None;

        if !self.settings.enabled() {
            info!("Deck connection closed, feature disabled");
            self.set_status(ConnectionStatus::ClosedFinal);
            return;
        }

        match self.retry.next_reconnect() {
            Some(delay) => {
                info!("Deck connection closed, reconnecting in {delay:?}");
                self.schedule_attempt(delay, AttemptOrigin::Reconnect);
                self.set_status(ConnectionStatus::ClosedWillRetry);
            }
            None => {
                warn!("Deck connection closed, retries exhausted");
                self.set_status(ConnectionStatus::ClosedFinal);
            }
        }
    }

    /// Close the current transport, if any, without scheduling a reconnect.
    ///
    /// An open transport is told to close by dropping its outbox and finishes
    /// the close handshake on its own; one still connecting is aborted.
    fn close_session(&mut self) {
        self.refresh_timer = None;

        let Some(session) = self.session.take() else {
            return;
        };

        if session.open {
            debug!("Closing deck connection {}", session.generation);
        } else {
            debug!("Abandoning deck connection {} mid-handshake", session.generation);
            session.task.abort();
        }
    }

    /// Best-effort delivery: anything sent while not open, or while the
    /// outbox is full, is dropped.
    fn send(&mut self, message: OutboundMessage) {
        let Some(session) = self.session.as_ref().filter(|session| session.open) else {
            trace!("Deck not open, dropping {} message", message.action());
            return;
        };

        let text = match protocol::encode(&message) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode {} message: {e}", message.action());
                return;
            }
        };

        match session.outbox.try_send(text) {
            Ok(()) => debug!("Queued {} message for deck", message.action()),
            Err(TrySendError::Full(_)) => {
                debug!("Deck outbox full, dropping {} message", message.action());
            }
            Err(TrySendError::Closed(_)) => {
                trace!("Deck transport gone, dropping {} message", message.action());
            }
        }
    }

    fn refresh_cycle(&mut self) {
        if !self.is_open() {
            return;
        }

        let payload = {
            let snapshot = self.source.snapshot();
            let Some(character) = self.source.current_character(&snapshot) else {
                trace!("No current character, skipping deck refresh");
                return;
            };
            package_state::<S, P>(&self.packager, &snapshot, &character)
        };

        self.send(OutboundMessage::State(payload));
    }

    /// Out-of-band refresh: push now and restart the periodic schedule.
    fn refresh_now(&mut self) {
        if !self.is_open() {
            trace!("Deck not open, ignoring refresh request");
            return;
        }

        self.refresh_cycle();
        self.restart_refresh_timer();
    }

    fn restart_refresh_timer(&mut self) {
        let mut timer = interval_at(Instant::now() + self.refresh_period, self.refresh_period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.refresh_timer = Some(timer);
    }

    fn install_farming_observer(&mut self) {
        if self.farming_observer_installed {
            return;
        }
        self.farming_observer_installed = true;

        let mut receiver = self.source.farming_mode();
        let active = *receiver.borrow_and_update();
        self.farming_mode = Some(receiver);

        debug!("Farming mode observer installed");
        self.send(OutboundMessage::FarmingMode(active));
    }

    fn install_refresh_observer(&mut self) {
        if self.refresh_observer_installed {
            return;
        }
        self.refresh_observer_installed = true;
        self.refresh_events = Some(self.source.refresh_events());
        debug!("Refresh event observer installed");
    }

    fn is_current_character(&self, store_id: &str) -> bool {
        let snapshot = self.source.snapshot();
        self.source
            .current_character(&snapshot)
            .is_some_and(|character| self.source.character_id(&character) == store_id)
    }

    fn is_open(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.open)
    }

    fn set_status(&self, status: ConnectionStatus) {
        let previous = self.status_tx.send_replace(status);
        if previous != status {
            debug!("Deck status {previous} -> {status}");
        }
    }
}

async fn sleep_until_deadline(attempt: Option<ScheduledAttempt>) -> AttemptOrigin {
    match attempt {
        Some(attempt) => {
            sleep_until(attempt.at).await;
            attempt.origin
        }
        None => pending().await,
    }
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => pending().await,
    }
}

/// Next farming-mode value, or `None` once the source is gone.
async fn farming_changed(receiver: &mut Option<watch::Receiver<bool>>) -> Option<bool> {
    match receiver {
        Some(receiver) => match receiver.changed().await {
            Ok(()) => Some(*receiver.borrow_and_update()),
            Err(_) => None,
        },
        None => pending().await,
    }
}

async fn refresh_signal(receiver: &mut Option<broadcast::Receiver<()>>) -> Result<(), RecvError> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => pending().await,
    }
}
