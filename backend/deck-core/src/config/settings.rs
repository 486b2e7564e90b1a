//! Read-only view of the user's deck settings.
//!
//! The connection manager consults these on every start attempt and on every
//! transport close, because the user can flip the feature off or clear the
//! credential while a retry is pending.

use crate::auth::DeckAuth;
use crate::config::DeckConfig;

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use log::warn;

/// Source of the "feature enabled" flag and the deck credential.
pub trait SettingsSource: Send + Sync + 'static {
    fn enabled(&self) -> bool;

    fn auth(&self) -> Option<DeckAuth>;
}

/// Settings backed by `deck.json`, re-read on every query.
///
/// A file that fails to load reads as "disabled, no credential".
pub struct FileSettings {
    config_dir: PathBuf,
}

impl FileSettings {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    fn current(&self) -> Option<DeckConfig> {
        match DeckConfig::load(&self.config_dir) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Deck settings unavailable, treating feature as disabled: {e}");
                None
            }
        }
    }
}

impl SettingsSource for FileSettings {
    fn enabled(&self) -> bool {
        self.current().is_some_and(|config| config.enabled)
    }

    fn auth(&self) -> Option<DeckAuth> {
        self.current().and_then(|config| config.deck_auth())
    }
}

/// In-memory settings shared with the embedding application.
///
/// Clones share the same values.
#[derive(Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<SettingsValues>>,
}

#[derive(Default)]
struct SettingsValues {
    enabled: bool,
    auth: Option<DeckAuth>,
}

impl SharedSettings {
    pub fn new(enabled: bool, auth: Option<DeckAuth>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SettingsValues { enabled, auth })),
        }
    }

    pub fn from_config(config: &DeckConfig) -> Self {
        Self::new(config.enabled, config.deck_auth())
    }

    pub fn set_enabled(&self, enabled: bool) {
        match self.inner.write() {
            Ok(mut values) => values.enabled = enabled,
            Err(poisoned) => poisoned.into_inner().enabled = enabled,
        }
    }

    pub fn set_auth(&self, auth: Option<DeckAuth>) {
        match self.inner.write() {
            Ok(mut values) => values.auth = auth,
            Err(poisoned) => poisoned.into_inner().auth = auth,
        }
    }
}

impl SettingsSource for SharedSettings {
    fn enabled(&self) -> bool {
        match self.inner.read() {
            Ok(values) => values.enabled,
            Err(poisoned) => poisoned.into_inner().enabled,
        }
    }

    fn auth(&self) -> Option<DeckAuth> {
        match self.inner.read() {
            Ok(values) => values.auth.clone(),
            Err(poisoned) => poisoned.into_inner().auth.clone(),
        }
    }
}
