//! TOML-based configuration for the keyboard host.
//!
//! Reads `AppConfig` from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Softkey\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/softkey/config.toml` or `~/.config/softkey/config.toml`
//! - macOS:    `~/Library/Application Support/Softkey/config.toml`
//!
//! or from an explicit path given on the command line.
//!
//! ```toml
//! [keyboard]
//! default_locale = "en-US"
//! floating_threshold_percent = 50
//! autocapitalization_enabled = true
//!
//! [logging]
//! log_level = "info"
//!
//! [[overrides]]
//! locale = "de"
//! name = "german-qwertz"
//! alphabetic = ["q w e r t z u i o p ü", "a s d f g h j k l ö ä", "y x c v b n m"]
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]`, so a partial file (or
//! no file at all) still yields a complete configuration.
//!
//! # Overrides
//!
//! Each `[[overrides]]` entry becomes a [`LocaleOverride`].  Rows are written
//! as space-separated key outputs, one string per row.  Groups that are left
//! out keep the input set's rows.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use softkey_core::domain::input_set::rows;
use softkey_core::{
    InputItem, InputSetError, KeyboardMode, LocaleError, LocaleId, LocaleOverride,
};

use crate::application::reconcile::DEFAULT_FLOATING_THRESHOLD_PERCENT;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A locale identifier in the file is malformed.
    #[error("invalid locale in config: {0}")]
    Locale(#[from] LocaleError),

    /// An override entry has an empty group or row.
    #[error("invalid override rows: {0}")]
    Override(#[from] InputSetError),

    /// The floating threshold is outside 1..=100.
    #[error("floating_threshold_percent must be between 1 and 100, got {0}")]
    FloatingThreshold(u32),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub keyboard: KeyboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub overrides: Vec<OverrideEntry>,
}

/// Keyboard behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyboardConfig {
    /// Locale used when the active locale has no input set.
    #[serde(default = "default_locale")]
    pub default_locale: String,
    /// A keyboard narrower than this share of the screen width floats.
    #[serde(default = "default_floating_threshold")]
    pub floating_threshold_percent: u32,
    /// Initial value of the "autocapitalization enabled" preference.
    #[serde(default = "default_true")]
    pub autocapitalization_enabled: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// One locale override declared in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverrideEntry {
    pub locale: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alphabetic: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbolic: Option<Vec<String>>,
    /// Space-separated keys placed before the space bar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_row: Option<String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_locale() -> String {
    "en-US".to_string()
}
fn default_floating_threshold() -> u32 {
    DEFAULT_FLOATING_THRESHOLD_PERCENT
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            default_locale: default_locale(),
            floating_threshold_percent: default_floating_threshold(),
            autocapitalization_enabled: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl KeyboardConfig {
    /// Parses `default_locale`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Locale`] if the identifier is malformed.
    pub fn default_locale(&self) -> Result<LocaleId, ConfigError> {
        Ok(LocaleId::parse(&self.default_locale)?)
    }

    /// Returns the floating threshold after checking its range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FloatingThreshold`] outside `1..=100`.
    pub fn floating_threshold(&self) -> Result<u32, ConfigError> {
        match self.floating_threshold_percent {
            percent @ 1..=100 => Ok(percent),
            other => Err(ConfigError::FloatingThreshold(other)),
        }
    }
}

impl OverrideEntry {
    /// Builds the registry key and strategy for this entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Locale`] for a malformed locale and
    /// [`ConfigError::Override`] for an empty group or row.
    pub fn to_override(&self) -> Result<(LocaleId, LocaleOverride), ConfigError> {
        let locale = LocaleId::parse(&self.locale)?;
        let mut strategy = LocaleOverride::new(self.name.clone());
        for (mode, group) in [
            (KeyboardMode::Alphabetic, &self.alphabetic),
            (KeyboardMode::Numeric, &self.numeric),
            (KeyboardMode::Symbolic, &self.symbolic),
        ] {
            if let Some(lines) = group {
                let row_lines: Vec<&str> = lines.iter().map(String::as_str).collect();
                strategy = strategy.with_group(mode, rows(&row_lines))?;
            }
        }
        if let Some(space_row) = &self.space_row {
            strategy = strategy.with_space_row_characters(
                space_row.split_whitespace().map(InputItem::new).collect(),
            );
        }
        Ok((locale, strategy))
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the platform config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads `AppConfig` from the platform config file, returning defaults if the
/// file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning defaults if the file is absent.
///
/// # Errors
///
/// Same as [`load_config`].
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Resolves the platform config directory including the `softkey` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Softkey"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("softkey"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library").join("Application Support").join("Softkey"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
