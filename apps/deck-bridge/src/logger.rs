//! Logging for the deck bridge.
//!
//! Every record goes to stdout (level coloured) and to `deck-bridge.log` in
//! the log directory, in the same line format. The level comes from
//! `$DECK_BRIDGE_LOG_LEVEL` when it names a valid level.

use crate::error::BridgeError;

use std::fmt::{Arguments, Display};
use std::io::stdout;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::SystemTime;

use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use fern::{Dispatch, FormatCallback};
use humantime::format_rfc3339_millis;
use log::{LevelFilter, Record, info, warn};

pub const LOG_FILE_NAME: &str = "deck-bridge.log";
pub const LOG_LEVEL_ENV: &str = "DECK_BRIDGE_LOG_LEVEL";

#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Crates that log every WebSocket frame below `Info`.
const CHATTY_TARGETS: [&str; 2] = ["tungstenite", "tokio_tungstenite"];

/// Level the global logger was installed with.
static INSTALLED_LEVEL: OnceLock<LevelFilter> = OnceLock::new();

/// Level named by `value` (case-insensitive), else [`DEFAULT_LOG_LEVEL`].
pub fn level_from(value: Option<&str>) -> LevelFilter {
    value
        .map(str::trim)
        .and_then(|value| LevelFilter::from_str(value).ok())
        .unwrap_or(DEFAULT_LOG_LEVEL)
}

/// Level from `$DECK_BRIDGE_LOG_LEVEL`.
pub fn level_from_env() -> LevelFilter {
    level_from(std::env::var(LOG_LEVEL_ENV).ok().as_deref())
}

/// Install the global logger.
///
/// Only the first call installs anything. Later calls keep the original
/// level, log a warning and return Ok.
///
/// # Errors
///
/// Returns [`BridgeError::Bridge`] if the log file cannot be opened or
/// another global logger is already in place.
pub fn initialize(log_dir: &Path, level: LevelFilter) -> Result<(), BridgeError> {
    let mut outcome = None;
    let installed = *INSTALLED_LEVEL.get_or_init(|| {
        outcome = Some(install(log_dir, level));
        level
    });

    match outcome {
        Some(result) => {
            result?;
            info!("Logging at {installed} to {}", log_dir.join(LOG_FILE_NAME).display());
        }
        None => warn!("Logger already installed at {installed}, ignoring {level}"),
    }

    Ok(())
}

fn install(log_dir: &Path, level: LevelFilter) -> Result<(), BridgeError> {
    let colours = ColoredLevelConfig::new()
        .trace(Magenta)
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red);

    let log_file = fern::log_file(log_dir.join(LOG_FILE_NAME))
        .map_err(|e| BridgeError::bridge(format!("Failed to open log file: {e}")))?;

    let root = CHATTY_TARGETS
        .iter()
        .fold(Dispatch::new().level(level), |dispatch, target| {
            dispatch.level_for(*target, level.min(LevelFilter::Info))
        });

    root.chain(
        Dispatch::new()
            .format(move |out, message, record| {
                write_line(out, message, record, colours.color(record.level()))
            })
            .chain(stdout()),
    )
    .chain(
        Dispatch::new()
            .format(|out, message, record| write_line(out, message, record, record.level()))
            .chain(log_file),
    )
    .apply()
    .map_err(|e| BridgeError::bridge(format!("Failed to install logger: {e}")))
}

fn write_line(
    out: FormatCallback<'_>,
    message: &Arguments<'_>,
    record: &Record<'_>,
    level: impl Display,
) {
    out.finish(format_args!(
        "{} {level:<5} {}: {message}",
        format_rfc3339_millis(SystemTime::now()),
        record.target(),
    ))
}
