//! Hands deck commands to the host application.
//!
//! Each command is appended as one JSON line to `commands.jsonl`; the host
//! application tails that file and applies the commands.

use crate::error::BridgeError;

use common::RedactedToken;

use deck_core::collaborators::CommandDispatcher;
use deck_core::protocol::InboundMessage;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use humantime::format_rfc3339_millis;
use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

pub const COMMAND_LOG_FILE_NAME: &str = "commands.jsonl";

/// One line of `commands.jsonl`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord<'a> {
    pub received_at: String,
    pub action: &'a str,
    pub fields: &'a Map<String, Value>,
}

/// Logs and records every inbound command.
///
/// The session token is neither logged nor written to the command file.
pub struct LoggingDispatcher {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LoggingDispatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `message` to the command file.
    pub fn record(&self, message: &InboundMessage) -> Result<(), BridgeError> {
        let record = CommandRecord {
            received_at: format_rfc3339_millis(SystemTime::now()).to_string(),
            action: &message.action,
            fields: &message.fields,
        };

        let mut line = serde_json::to_string(&record)
            .map_err(|e| BridgeError::dispatch(format!("Failed to encode command: {e}")))?;
        line.push('\n');

        let _guard = match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                BridgeError::dispatch(format!("Failed to open {}: {e}", self.path.display()))
            })?;

        file.write_all(line.as_bytes()).map_err(|e| {
            BridgeError::dispatch(format!("Failed to write {}: {e}", self.path.display()))
        })?;

        Ok(())
    }
}

impl CommandDispatcher for LoggingDispatcher {
    fn dispatch(&self, message: InboundMessage, _token: &RedactedToken) {
        let field_names: Vec<&str> = message.fields.keys().map(String::as_str).collect();
        info!(
            "Deck command '{}' received (fields: {})",
            message.action,
            field_names.join(", ")
        );

        if let Err(e) = self.record(&message) {
            warn!("Deck command '{}' not recorded: {e}", message.action);
        }
    }
}
