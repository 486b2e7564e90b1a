//! Boundaries between the connection manager and the host application.
//!
//! The manager never looks inside application state. It asks a
//! [`StateSource`] whether state is ready and for a snapshot, hands that
//! snapshot to a [`Packager`] to build the wire payload, and passes inbound
//! commands to a [`CommandDispatcher`].

use crate::protocol::{InboundMessage, StatePayload};

use common::RedactedToken;

use serde_json::Value;
use tokio::sync::{broadcast, watch};

/// Loading flags the manager waits on before its first connect attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub global_settings_loaded: bool,
    pub reference_data_loaded: bool,
    pub profile_loaded: bool,
}

impl Readiness {
    pub fn ready() -> Self {
        Self {
            global_settings_loaded: true,
            reference_data_loaded: true,
            profile_loaded: true,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.global_settings_loaded && self.reference_data_loaded && self.profile_loaded
    }
}

/// Application state as seen by the manager.
pub trait StateSource: Send + Sync + 'static {
    /// Point-in-time copy of whatever the packager needs.
    type Snapshot: Send;

    /// The character the user is currently viewing.
    type Character: Send;

    fn readiness(&self) -> Readiness;

    fn snapshot(&self) -> Self::Snapshot;

    fn current_character(&self, snapshot: &Self::Snapshot) -> Option<Self::Character>;

    /// Store id of a character, as used in item-move notifications.
    fn character_id<'a>(&self, character: &'a Self::Character) -> &'a str;

    /// Farming-mode flag. The manager pushes every change to the deck.
    fn farming_mode(&self) -> watch::Receiver<bool>;

    /// Fires when the application reloads its data and the deck should be refreshed early.
    fn refresh_events(&self) -> broadcast::Receiver<()>;
}

/// Maps a snapshot to the sections of the `state` payload.
pub trait Packager<S: StateSource>: Send + Sync + 'static {
    fn postmaster(&self, character: &S::Character) -> Value;

    fn max_power(&self, character: &S::Character, snapshot: &S::Snapshot) -> Value;

    fn vault(&self, snapshot: &S::Snapshot) -> Value;

    fn metrics(&self, snapshot: &S::Snapshot) -> Value;

    fn equipped_items(&self, character: &S::Character) -> Value;
}

/// Applies commands received from the deck.
pub trait CommandDispatcher: Send + Sync + 'static {
    fn dispatch(&self, message: InboundMessage, token: &RedactedToken);
}

/// Assemble the full `state` payload for one character.
pub fn package_state<S, P>(
    packager: &P,
    snapshot: &S::Snapshot,
    character: &S::Character,
) -> StatePayload
where
    S: StateSource,
    P: Packager<S>,
{
    StatePayload {
        postmaster: packager.postmaster(character),
        max_power: packager.max_power(character, snapshot),
        vault: packager.vault(snapshot),
        metrics: packager.metrics(snapshot),
        equipped_items: packager.equipped_items(character),
    }
}
