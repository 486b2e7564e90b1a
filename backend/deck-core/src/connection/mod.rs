//! Connection manager for the local deck.
//!
//! Keeps at most one WebSocket to `ws://localhost:9120/<instance>` alive
//! while the feature is enabled and a credential is configured:
//!
//! - waits for application state before the first attempt
//! - reconnects on a fixed delay after the transport closes
//! - pushes a full `state` message on open and on every refresh tick
//! - pushes farming-mode changes as they happen
//! - hands inbound commands to the [`CommandDispatcher`](crate::collaborators::CommandDispatcher)
//!
//! # Architecture
//!
//! A [`DeckHandle`] sends commands over an mpsc channel to a single task that
//! owns all mutable state. Status is published through a `watch` channel, so
//! reads never wait on the actor.

mod handle;
mod manager;
pub mod retry;
mod status;
mod transport;

pub use handle::DeckHandle;
pub use manager::{ManagerOptions, spawn_connection_manager};
pub use retry::RetryPolicy;
pub use status::ConnectionStatus;
