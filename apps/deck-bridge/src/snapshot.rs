//! Application state read from a JSON file the host application keeps current.
//!
//! The host writes `snapshot.json` whenever its state changes; a poll task
//! re-reads it and publishes readiness, farming mode and refresh events to
//! the connection manager.

use crate::error::BridgeError;

use deck_core::collaborators::{Readiness, StateSource};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

pub const SNAPSHOT_FILE_NAME: &str = "snapshot.json";

const REFRESH_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadinessFlags {
    pub global_settings_loaded: bool,
    pub reference_data_loaded: bool,
    pub profile_loaded: bool,
}

impl From<ReadinessFlags> for Readiness {
    fn from(flags: ReadinessFlags) -> Self {
        Readiness {
            global_settings_loaded: flags.global_settings_loaded,
            reference_data_loaded: flags.reference_data_loaded,
            profile_loaded: flags.profile_loaded,
        }
    }
}

/// Per-character sections of the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterSnapshot {
    /// Filled in from the `characters` map key.
    #[serde(skip)]
    pub id: String,
    pub postmaster: Value,
    pub equipped_items: Value,
}

/// Contents of `snapshot.json`.
///
/// ```json
/// {
///   "readiness": { "globalSettingsLoaded": true, "referenceDataLoaded": true, "profileLoaded": true },
///   "farmingMode": false,
///   "currentCharacterId": "2305843009",
///   "characters": { "2305843009": { "postmaster": {}, "equippedItems": [] } },
///   "maxPower": { "2305843009": 2010 },
///   "vault": {},
///   "metrics": {}
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSnapshot {
    pub readiness: ReadinessFlags,
    pub farming_mode: bool,
    pub current_character_id: Option<String>,
    pub characters: HashMap<String, CharacterSnapshot>,
    pub max_power: HashMap<String, Value>,
    pub vault: Value,
    pub metrics: Value,
}

impl AppSnapshot {
    pub fn parse(contents: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(contents)
            .map_err(|e| BridgeError::snapshot(format!("Invalid snapshot JSON: {e}")))
    }

    pub fn current_character(&self) -> Option<CharacterSnapshot> {
        let id = self.current_character_id.as_ref()?;
        let mut character = self.characters.get(id)?.clone();
        character.id = id.clone();
        Some(character)
    }
}

/// [`StateSource`] backed by `snapshot.json`.
///
/// Starts empty (nothing loaded) until the first successful [`reload`](Self::reload).
pub struct FileStateSource {
    path: PathBuf,
    latest: RwLock<Arc<AppSnapshot>>,
    last_contents: Mutex<Option<String>>,
    farming_tx: watch::Sender<bool>,
    refresh_tx: broadcast::Sender<()>,
}

impl FileStateSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (farming_tx, _) = watch::channel(false);
        let (refresh_tx, _) = broadcast::channel(REFRESH_CHANNEL_CAPACITY);

        Self {
            path: path.into(),
            latest: RwLock::new(Arc::new(AppSnapshot::default())),
            last_contents: Mutex::new(None),
            farming_tx,
            refresh_tx,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the snapshot file.
    ///
    /// Returns `Ok(true)` when new content was published. A missing or
    /// unchanged file returns `Ok(false)`. On error the previous snapshot stays.
    pub fn reload(&self) -> Result<bool, BridgeError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(BridgeError::snapshot(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        let mut last_contents = lock(&self.last_contents);
        if last_contents.as_deref() == Some(contents.as_str()) {
            return Ok(false);
        }

        // Invalid content is remembered too, so it is reported once per edit.
        let parsed = AppSnapshot::parse(&contents);
        *last_contents = Some(contents);
        drop(last_contents);

        let snapshot = parsed?;
        let farming_mode = snapshot.farming_mode;

        match self.latest.write() {
            Ok(mut latest) => *latest = Arc::new(snapshot),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(snapshot),
        }

        self.farming_tx.send_if_modified(|current| {
            if *current == farming_mode {
                return false;
            }
            *current = farming_mode;
            true
        });

        // No receivers until the manager installs its observer.
        let _ = self.refresh_tx.send(());

        debug!("Application snapshot reloaded from {}", self.path.display());
        Ok(true)
    }

    /// Poll the snapshot file every `period` on the current runtime.
    pub fn spawn_polling(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        info!(
            "Watching {} for application state every {period:?}",
            self.path.display()
        );

        tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                timer.tick().await;
                if let Err(e) = self.reload() {
                    warn!("Keeping previous application snapshot: {e}");
                }
            }
        })
    }

    fn current(&self) -> Arc<AppSnapshot> {
        match self.latest.read() {
            Ok(latest) => latest.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl StateSource for FileStateSource {
    type Snapshot = Arc<AppSnapshot>;
    type Character = CharacterSnapshot;

    fn readiness(&self) -> Readiness {
        self.current().readiness.into()
    }

    fn snapshot(&self) -> Arc<AppSnapshot> {
        self.current()
    }

    fn current_character(&self, snapshot: &Arc<AppSnapshot>) -> Option<CharacterSnapshot> {
        snapshot.current_character()
    }

    fn character_id<'a>(&self, character: &'a CharacterSnapshot) -> &'a str {
        &character.id
    }

    fn farming_mode(&self) -> watch::Receiver<bool> {
        self.farming_tx.subscribe()
    }

    fn refresh_events(&self) -> broadcast::Receiver<()> {
        self.refresh_tx.subscribe()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
