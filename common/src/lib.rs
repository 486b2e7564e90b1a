//! Shared primitives for the deck bridge workspace.
//!
//! This crate holds the small types every other crate leans on:
//!
//! - [`ErrorLocation`]: call-site capture attached to every error variant
//! - [`RedactedToken`]: the deck auth token, never printed or serialized
//!
//! ## Architecture
//!
//! - **common** (this crate): error plumbing and secret handling
//! - **deck-core**: connection manager, protocol, configuration
//! - **deck-bridge**: binary wiring everything together

pub mod error;
pub mod redacted_token;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_token::RedactedToken;

#[cfg(test)]
mod tests;
