//! Delays between connection attempts.

use crate::config::TimingConfig;

use std::time::Duration;

use backoff::backoff::{Backoff, Constant};

/// The two retry chains the manager runs.
///
/// - `prerequisites`: re-polls while application state is still loading
/// - `reconnect`: re-enters start after the transport closed
///
/// Each is an ordinary [`Backoff`]; a chain that yields `None` gives up and
/// leaves the manager in `ClosedFinal`. Both are reset when a connection opens.
pub struct RetryPolicy {
    prerequisites: Box<dyn Backoff + Send>,
    reconnect: Box<dyn Backoff + Send>,
}

impl RetryPolicy {
    pub fn new(
        prerequisites: impl Backoff + Send + 'static,
        reconnect: impl Backoff + Send + 'static,
    ) -> Self {
        Self {
            prerequisites: Box::new(prerequisites),
            reconnect: Box::new(reconnect),
        }
    }

    /// Fixed delays, unbounded attempts.
    pub fn fixed(timing: &TimingConfig) -> Self {
        Self::new(
            Constant::new(timing.prerequisite_poll()),
            Constant::new(timing.reconnect_delay()),
        )
    }

    pub fn next_prerequisite_poll(&mut self) -> Option<Duration> {
        self.prerequisites.next_backoff()
    }

    pub fn next_reconnect(&mut self) -> Option<Duration> {
        self.reconnect.next_backoff()
    }

    pub fn reset(&mut self) {
        self.prerequisites.reset();
        self.reconnect.reset();
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(&TimingConfig::default())
    }
}
