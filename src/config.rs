//! Configuration management for Counterstrafe Trainer
//!
//! Provides persistent configuration that is saved to and loaded from a
//! platform-specific config file.
//!
//! ## Config File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/counterstrafe-trainer/config.toml` |
//! | macOS | `~/Library/Application Support/counterstrafe-trainer/config.toml` |
//! | Windows | `%APPDATA%\counterstrafe-trainer\config.toml` |
//!
//! ## Example
//!
//! ```no_run
//! use counterstrafe_trainer::Config;
//!
//! // Load existing config or use defaults
//! let mut config = Config::load().unwrap_or_default();
//!
//! // Modify settings
//! config.bindings.set_threshold("80");
//!
//! // Save to disk
//! config.save().expect("Failed to save config");
//! ```

use crate::bindings::KeyBindings;
use crate::round::{RoundPolicy, DEFAULT_MIN_HOLD_MS, DEFAULT_TIMEOUT_MS};
use crate::session::SessionSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const APP_DIR: &str = "counterstrafe-trainer";

/// Shortest time an outcome stays on screen
pub const MIN_RESULT_DISPLAY_MS: u64 = 1500;
/// Longest time an outcome stays on screen
pub const MAX_RESULT_DISPLAY_MS: u64 = 2000;
/// Rounds per session
pub const DEFAULT_MAX_ROUNDS: u32 = 10;

/// Error type for configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine config directory
    #[error("Could not determine config directory")]
    NoConfigDir,
    /// IO error reading or writing config file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Failed to parse config file
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Failed to serialize config
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Directory holding the config file and logs; created on demand
pub fn app_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    let app_dir = config_dir.join(APP_DIR);

    if !app_dir.exists() {
        fs::create_dir_all(&app_dir)?;
    }

    Ok(app_dir)
}

/// Returns the path to the config file.
///
/// Creates the config directory if it doesn't exist.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dir()?.join("config.toml"))
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Trained keys and pass threshold
    #[serde(default)]
    pub bindings: KeyBindings,
    /// Round and session timing policy
    #[serde(default)]
    pub policy: PolicyConfig,
    /// UI settings
    #[serde(default)]
    pub ui: UiConfig,
}

/// Timing and scoring policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Minimum hold of the first key in ms; 0 disables the guard
    pub min_hold_ms: u64,
    /// How long to wait for the counter key after release
    pub timeout_ms: u64,
    /// How long each outcome stays on screen
    pub result_display_ms: u64,
    /// Rounds per session
    pub max_rounds: u32,
    /// Upper bound applied to the reported session score
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_cap: Option<u32>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_hold_ms: DEFAULT_MIN_HOLD_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            result_display_ms: MIN_RESULT_DISPLAY_MS,
            max_rounds: DEFAULT_MAX_ROUNDS,
            score_cap: None,
        }
    }
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    /// Refresh rate for UI updates (in Hz)
    pub refresh_rate_hz: u32,
    /// Color theme (dark/light)
    pub theme: Theme,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 60,
            theme: Theme::Dark,
        }
    }
}

/// Color theme options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Config {
    /// Load configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config.normalized())
    }

    /// Save configuration to the default config file.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Clamp every value into its supported range
    pub fn normalized(mut self) -> Self {
        self.bindings = self.bindings.normalized();

        let display = self
            .policy
            .result_display_ms
            .clamp(MIN_RESULT_DISPLAY_MS, MAX_RESULT_DISPLAY_MS);
        if display != self.policy.result_display_ms {
            log::warn!(
                "result_display_ms {} out of range, using {}",
                self.policy.result_display_ms,
                display
            );
            self.policy.result_display_ms = display;
        }
        if self.policy.timeout_ms == 0 {
            log::warn!("timeout_ms must be positive, using {}", DEFAULT_TIMEOUT_MS);
            self.policy.timeout_ms = DEFAULT_TIMEOUT_MS;
        }
        self.policy.max_rounds = self.policy.max_rounds.max(1);
        self.ui.refresh_rate_hz = self.ui.refresh_rate_hz.clamp(1, 1000);
        self
    }

    /// Per-round timing policy
    pub fn round_policy(&self) -> RoundPolicy {
        RoundPolicy {
            min_hold: Duration::from_millis(self.policy.min_hold_ms),
            timeout: Duration::from_millis(self.policy.timeout_ms),
        }
    }

    /// Everything the session controller needs
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            bindings: self.bindings,
            policy: self.round_policy(),
            result_display: Duration::from_millis(self.policy.result_display_ms),
            max_rounds: self.policy.max_rounds,
            score_cap: self.policy.score_cap,
        }
    }

    /// Get UI refresh interval as Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.ui.refresh_rate_hz.max(1) as u64)
    }
}
