//! Handle to a running connection manager.

use crate::connection::manager::Command;
use crate::connection::status::ConnectionStatus;
use crate::error::connection::ConnectionError;
use crate::protocol::{EquipmentStatus, OutboundMessage};

use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable front door to the manager actor.
///
/// Every method only fails with [`ConnectionError::ManagerStopped`] once the
/// manager has shut down. Connection problems never surface here; they show
/// up as [`ConnectionStatus`] changes.
///
/// # Examples
///
/// ```no_run
/// use deck_core::connection::DeckHandle;
/// use deck_core::protocol::OutboundMessage;
///
/// async fn toggle(deck: &DeckHandle) -> Result<(), deck_core::error::connection::ConnectionError> {
///     deck.start().await?;
///     deck.send(OutboundMessage::FarmingMode(true)).await?;
///     deck.stop().await
/// }
/// ```
#[derive(Clone)]
pub struct DeckHandle {
    command_tx: mpsc::Sender<Command>,
    status_rx: watch::Receiver<ConnectionStatus>,
}

impl DeckHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        status_rx: watch::Receiver<ConnectionStatus>,
    ) -> Self {
        Self {
            command_tx,
            status_rx,
        }
    }

    /// Request a connection.
    ///
    /// Waits for application state, then connects if the feature is enabled
    /// and a credential is configured. Any existing connection is closed first.
    pub async fn start(&self) -> Result<(), ConnectionError> {
        self.command(Command::Start).await
    }

    /// Close the connection and cancel the refresh timer and any pending retry.
    ///
    /// Returns once the manager has processed the stop.
    pub async fn stop(&self) -> Result<(), ConnectionError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.command(Command::Stop(ack_tx)).await?;
        ack_rx.await.map_err(|_| ConnectionError::manager_stopped())
    }

    /// Send a message if the connection is open; dropped otherwise.
    pub async fn send(&self, message: OutboundMessage) -> Result<(), ConnectionError> {
        self.command(Command::Send(message)).await
    }

    /// Tell the deck an item was equipped or unequipped on the current character.
    pub async fn send_equipment_status(
        &self,
        item_id: impl Into<String>,
        equipped: bool,
    ) -> Result<(), ConnectionError> {
        self.send(OutboundMessage::EquipmentStatus(EquipmentStatus {
            item_id: item_id.into(),
            equipped,
        }))
        .await
    }

    /// Tell the deck an item moved to `store_id`.
    ///
    /// The item counts as equipped when `store_id` is the current character.
    pub async fn send_equipment_location(
        &self,
        item_id: impl Into<String>,
        store_id: impl Into<String>,
    ) -> Result<(), ConnectionError> {
        self.command(Command::EquipmentMoved {
            item_id: item_id.into(),
            store_id: store_id.into(),
        })
        .await
    }

    /// Push state now and restart the periodic refresh schedule.
    pub async fn refresh(&self) -> Result<(), ConnectionError> {
        self.command(Command::Refresh).await
    }

    /// Stop and end the manager task.
    pub async fn shutdown(&self) -> Result<(), ConnectionError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.command(Command::Shutdown(ack_tx)).await?;
        ack_rx.await.map_err(|_| ConnectionError::manager_stopped())
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    async fn command(&self, command: Command) -> Result<(), ConnectionError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ConnectionError::manager_stopped())
    }
}
