pub mod settings;

pub use settings::{FileSettings, SettingsSource, SharedSettings};

use crate::auth::DeckAuth;
use crate::error::config::ConfigError;
use crate::{DECK_HOSTNAME, DECK_PORT};

use common::{ErrorLocation, RedactedToken};

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "deck.json";
const CONFIG_VERSION: u32 = 1;

// ============================================
// CONFIG STRUCTS
// ============================================

/// Credential as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub instance: String,
    #[serde(serialize_with = "serialize_token")]
    pub token: RedactedToken,
}

impl AuthConfig {
    pub fn to_auth(&self) -> DeckAuth {
        DeckAuth::new(self.instance.clone(), self.token.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Delays driving the connection lifecycle, in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimingConfig {
    #[serde(default = "default_prerequisite_poll_ms")]
    pub prerequisite_poll_ms: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl TimingConfig {
    pub fn prerequisite_poll(&self) -> Duration {
        Duration::from_millis(self.prerequisite_poll_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            prerequisite_poll_ms: default_prerequisite_poll_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// User-facing "mirror to deck" switch.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub auth: Option<AuthConfig>,

    #[serde(default)]
    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub timing: TimingConfig,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            enabled: false,
            auth: None,
            endpoint: EndpointConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_host() -> String {
    DECK_HOSTNAME.to_string()
}
fn default_port() -> u16 {
    DECK_PORT
}
fn default_prerequisite_poll_ms() -> u64 {
    1_000
}
fn default_reconnect_delay_ms() -> u64 {
    2_500
}
fn default_refresh_interval_ms() -> u64 {
    30_000
}

// Tokens refuse serde serialization, so the config file writer opts in here.
fn serialize_token<S>(token: &RedactedToken, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(token.as_str())
}

// ============================================
// IMPLEMENTATION
// ============================================

impl DeckConfig {
    /// Load config from {config_dir}/deck.json.
    ///
    /// # Returns
    ///
    /// Returns `Ok(DeckConfig)` if loaded successfully or defaults if the file is missing.
    /// Returns `Err(ConfigError)` if the file exists but is unreadable, corrupted or invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        let contents = match std::fs::read_to_string(&config_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Deck config not found at {}, using defaults",
                    config_path.display()
                );
                return Ok(Self::default());
            }
            Err(e) => {
                warn!("Failed to read deck config: {}", e);
                return Err(ConfigError::ReadError {
                    location: ErrorLocation::from(Location::caller()),
                    path: config_path,
                    source: e,
                });
            }
        };

        let config: DeckConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse deck config JSON: {}", e);
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Save config to {config_dir}/deck.json using temp file + rename.
    ///
    /// The connection manager never calls this; it exists for the host
    /// application's settings screen and for tests.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{}.tmp", CONFIG_FILE_NAME));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Deck config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::validation(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, CONFIG_VERSION
            )));
        }

        if self.endpoint.host.trim().is_empty() {
            return Err(ConfigError::validation("endpoint.host cannot be empty"));
        }

        if self.endpoint.port == 0 {
            return Err(ConfigError::validation("endpoint.port cannot be 0"));
        }

        let timings = [
            ("prerequisite_poll_ms", self.timing.prerequisite_poll_ms),
            ("reconnect_delay_ms", self.timing.reconnect_delay_ms),
            ("refresh_interval_ms", self.timing.refresh_interval_ms),
        ];
        for (name, value) in timings {
            if value == 0 {
                return Err(ConfigError::validation(format!(
                    "timing.{name} must be greater than 0"
                )));
            }
        }

        if let Some(ref auth) = self.auth {
            if auth.instance.is_empty() {
                return Err(ConfigError::validation("auth.instance cannot be empty"));
            }

            if auth.instance.contains(['/', '?', '#']) {
                return Err(ConfigError::validation(format!(
                    "auth.instance contains URL delimiters: {}",
                    auth.instance
                )));
            }

            if auth.token.is_empty() {
                return Err(ConfigError::validation("auth.token cannot be empty"));
            }
        }

        Ok(())
    }

    /// The credential, if one is configured.
    pub fn deck_auth(&self) -> Option<DeckAuth> {
        self.auth.as_ref().map(AuthConfig::to_auth)
    }
}
