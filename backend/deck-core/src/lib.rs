pub mod auth;
pub mod collaborators;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;

#[cfg(test)]
mod tests;

pub const DECK_HOSTNAME: &str = "localhost";
pub const DECK_PORT: u16 = 9120;
pub const DECK_URL_SCHEME: &str = "ws";
pub const DECK_DEFAULT_BASE_URL: &str =
    const_format::concatcp!(DECK_URL_SCHEME, "://", DECK_HOSTNAME, ":", DECK_PORT);
