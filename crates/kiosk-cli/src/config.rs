//! Configuration loading – reads `config.toml`, applies overrides, and
//! validates the result into a [`KioskConfig`].
//!
//! Search order for the file (first existing wins):
//!
//! 1. `--config <path>` (must exist)
//! 2. `$KIOSK_CONFIG` (must exist)
//! 3. `~/.kiosk/config.toml`
//! 4. `/etc/kiosk/config.toml`
//!
//! No file at all means defaults.  Values are layered as
//! command line > environment > file > defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use kiosk_types::{
    Bookmark, KioskConfig, KioskError, QuitButtonMode, TimeoutConfig, TimeoutMode, WhitelistSetting,
};

/// Configuration file as written by the operator.
///
/// Mode fields stay strings and `whitelist` stays a raw TOML value until
/// [`ConfigFile::validate`] so that bad values produce a precise error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// `true`, `false`, or a list of hosts.
    pub whitelist: Option<toml::Value>,
    pub start_url: Option<String>,
    pub bookmarks: BTreeMap<String, Bookmark>,
    /// Inactivity timeout in seconds.
    pub timeout: Option<u64>,
    pub timeout_mode: Option<String>,
    pub screensaver_url: Option<String>,
    pub allow_popups: Option<bool>,
    pub allow_external_content: Option<bool>,
    pub navigation: Option<bool>,
    pub quit_button_mode: Option<String>,
    pub content_handlers: BTreeMap<String, String>,
}

/// Values supplied on the command line.  `None` leaves the lower layers
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub start_url: Option<String>,
    pub timeout: Option<u64>,
    pub allow_popups: Option<bool>,
    pub allow_external_content: Option<bool>,
    pub navigation: Option<bool>,
}

/// A validated configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: KioskConfig,
    /// `None` when no file was found and defaults were used.
    pub source: Option<PathBuf>,
}

impl ConfigFile {
    /// Layer command-line `overrides` on top of this file.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = &overrides.start_url {
            self.start_url = Some(url.clone());
        }
        if let Some(timeout) = overrides.timeout {
            self.timeout = Some(timeout);
        }
        if let Some(allow) = overrides.allow_popups {
            self.allow_popups = Some(allow);
        }
        if let Some(allow) = overrides.allow_external_content {
            self.allow_external_content = Some(allow);
        }
        if let Some(show) = overrides.navigation {
            self.navigation = Some(show);
        }
    }

    /// Check every value and build the immutable [`KioskConfig`].
    ///
    /// # Errors
    ///
    /// - [`KioskError::InvalidTimeoutMode`] – unknown `timeout_mode`.
    /// - [`KioskError::InvalidQuitButtonMode`] – unknown `quit_button_mode`.
    /// - [`KioskError::InvalidWhitelist`] – `whitelist` is not a bool or a
    ///   list of strings.
    pub fn validate(self) -> Result<KioskConfig, KioskError> {
        let defaults = KioskConfig::default();

        let timeout_mode = match self.timeout_mode.as_deref() {
            Some(mode) => mode.trim().parse::<TimeoutMode>()?,
            None => defaults.timeout.timeout_mode,
        };
        let quit_button_mode = match self.quit_button_mode.as_deref() {
            Some(mode) => mode.trim().parse::<QuitButtonMode>()?,
            None => defaults.quit_button_mode,
        };

        Ok(KioskConfig {
            whitelist: whitelist_setting(self.whitelist)?,
            start_url: self.start_url.unwrap_or(defaults.start_url),
            bookmarks: self.bookmarks,
            timeout: TimeoutConfig {
                timeout_seconds: self.timeout.unwrap_or(defaults.timeout.timeout_seconds),
                timeout_mode,
                screensaver_url: self
                    .screensaver_url
                    .unwrap_or(defaults.timeout.screensaver_url),
            },
            allow_popups: self.allow_popups.unwrap_or(defaults.allow_popups),
            allow_external_content: self
                .allow_external_content
                .unwrap_or(defaults.allow_external_content),
            navigation: self.navigation.unwrap_or(defaults.navigation),
            quit_button_mode,
            content_handlers: self.content_handlers,
        })
    }
}

fn whitelist_setting(value: Option<toml::Value>) -> Result<Option<WhitelistSetting>, KioskError> {
    match value {
        None => Ok(None),
        Some(toml::Value::Boolean(flag)) => Ok(Some(WhitelistSetting::Flag(flag))),
        Some(toml::Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                toml::Value::String(host) => Ok(host),
                other => Err(KioskError::InvalidWhitelist(format!(
                    "list entries must be host strings, found {}",
                    other.type_str()
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|hosts| Some(WhitelistSetting::Hosts(hosts))),
        Some(other) => Err(KioskError::InvalidWhitelist(format!(
            "expected true, false or a list of hosts, found {}",
            other.type_str()
        ))),
    }
}

/// Apply `KIOSK_*` environment variable overrides to `file`.
///
/// | Variable | Config field |
/// |---|---|
/// | `KIOSK_START_URL` | `start_url` |
/// | `KIOSK_TIMEOUT` | `timeout` |
/// | `KIOSK_TIMEOUT_MODE` | `timeout_mode` |
/// | `KIOSK_SCREENSAVER_URL` | `screensaver_url` |
///
/// A `KIOSK_TIMEOUT` that is not a non-negative integer is ignored.
pub fn apply_env_overrides(file: &mut ConfigFile) {
    if let Ok(v) = std::env::var("KIOSK_START_URL") {
        file.start_url = Some(v);
    }
    if let Ok(v) = std::env::var("KIOSK_TIMEOUT")
        && let Ok(seconds) = v.trim().parse::<u64>()
    {
        file.timeout = Some(seconds);
    }
    if let Ok(v) = std::env::var("KIOSK_TIMEOUT_MODE") {
        file.timeout_mode = Some(v);
    }
    if let Ok(v) = std::env::var("KIOSK_SCREENSAVER_URL") {
        file.screensaver_url = Some(v);
    }
}

/// Default search locations below `home`, most specific first.
pub(crate) fn default_paths_for_home(home: &str) -> Vec<PathBuf> {
    vec![
        PathBuf::from(home).join(".kiosk").join("config.toml"),
        PathBuf::from("/etc/kiosk/config.toml"),
    ]
}

/// Resolve which file to read.
///
/// An explicit path (argument or `$KIOSK_CONFIG`) is returned even when it
/// does not exist so that loading reports the mistake.
pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var("KIOSK_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    default_paths_for_home(&home)
        .into_iter()
        .find(|path| path.exists())
}

/// Read and parse a config file.
pub(crate) fn read_file(path: &Path) -> Result<ConfigFile, KioskError> {
    let raw = fs::read_to_string(path).map_err(|e| KioskError::ConfigIo {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;
    toml::from_str(&raw).map_err(|e| KioskError::ConfigParse(e.to_string()))
}

/// Load, layer, and validate the configuration.
pub fn load(explicit: Option<&Path>, overrides: &Overrides) -> Result<LoadedConfig, KioskError> {
    let source = resolve_path(explicit);
    let mut file = match &source {
        Some(path) => read_file(path)?,
        None => ConfigFile::default(),
    };
    apply_env_overrides(&mut file);
    file.apply_overrides(overrides);
    Ok(LoadedConfig {
        config: file.validate()?,
        source,
    })
}
