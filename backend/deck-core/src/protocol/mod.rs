//! Wire format spoken with the deck.
//!
//! Both directions are JSON text frames. Outbound frames are
//! `{ "action": ..., "data": ... }`; inbound frames carry an `action` plus
//! command-specific fields that this crate passes through untouched.

mod inbound;
mod outbound;

pub use inbound::{InboundMessage, decode};
pub use outbound::{EquipmentStatus, OutboundMessage, StatePayload, encode};
