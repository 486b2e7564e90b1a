use std::fmt;

/// Lifecycle of the deck connection as published by the manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Never started, stopped explicitly, or the feature is off / unauthenticated.
    #[default]
    Idle,
    /// Application state has not loaded yet; re-polling.
    WaitingForPrerequisites,
    /// Transport handshake in flight.
    Connecting,
    Open,
    /// Transport closed while the feature is still enabled; a reconnect is scheduled.
    ClosedWillRetry,
    /// Transport closed and nothing further will be attempted until the next start.
    ClosedFinal,
}

impl ConnectionStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionStatus::Open)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Idle => "idle",
            ConnectionStatus::WaitingForPrerequisites => "waiting-for-prerequisites",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Open => "open",
            ConnectionStatus::ClosedWillRetry => "closed-will-retry",
            ConnectionStatus::ClosedFinal => "closed-final",
        };
        f.write_str(label)
    }
}
