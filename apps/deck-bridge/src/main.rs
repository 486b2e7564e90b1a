use deck_bridge::dispatcher::{COMMAND_LOG_FILE_NAME, LoggingDispatcher};
use deck_bridge::error::BridgeError;
use deck_bridge::logger::{initialize as LoggerInitialize, level_from_env};
use deck_bridge::packager::JsonPackager;
use deck_bridge::paths;
use deck_bridge::snapshot::{FileStateSource, SNAPSHOT_FILE_NAME};

use deck_core::config::{DeckConfig, FileSettings, SettingsSource};
use deck_core::connection::{ManagerOptions, spawn_connection_manager};

use std::fs::create_dir_all;
use std::sync::Arc;

use log::{info, warn};

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    // A missing .env is normal
    let _ = dotenvy::dotenv();

    let config_dir = paths::config_dir()?;
    let log_dir = paths::log_dir()?;

    for dir in [&config_dir, &log_dir] {
        create_dir_all(dir).map_err(|e| {
            BridgeError::bridge(format!("Failed to create {}: {e}", dir.display()))
        })?;
    }

    // Initialize logger FIRST
    LoggerInitialize(&log_dir, level_from_env())?;

    info!("Deck bridge starting");
    info!("Config directory: {}", config_dir.display());
    info!("Log directory: {}", log_dir.display());

    let config = DeckConfig::load(&config_dir).unwrap_or_else(|e| {
        warn!("Using default deck config: {e}");
        DeckConfig::default()
    });

    let source = Arc::new(FileStateSource::new(config_dir.join(SNAPSHOT_FILE_NAME)));
    let _poller = source
        .clone()
        .spawn_polling(config.timing.prerequisite_poll());

    let settings: Arc<dyn SettingsSource> = Arc::new(FileSettings::new(&config_dir));
    let deck = spawn_connection_manager(
        settings,
        source,
        JsonPackager,
        LoggingDispatcher::new(config_dir.join(COMMAND_LOG_FILE_NAME)),
        ManagerOptions::from_config(&config),
    );

    let mut status = deck.subscribe_status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            info!("Deck connection {}", *status.borrow_and_update());
        }
    });

    deck.start().await?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| BridgeError::bridge(format!("Failed to listen for Ctrl-C: {e}")))?;

    info!("Shutdown requested");
    deck.shutdown().await?;

    Ok(())
}
