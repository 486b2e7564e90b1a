pub mod config;
pub mod connection;
pub mod protocol;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Connection(#[from] connection::ConnectionError),

    #[error(transparent)]
    Protocol(#[from] protocol::ProtocolError),
}
