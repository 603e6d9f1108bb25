use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Normalized hostname taken from a URL authority.
///
/// Always lowercase, with no scheme, userinfo, port, or path.  A trailing
/// root dot (`example.com.`) is dropped so that both spellings compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Host(String);

impl Host {
    /// Normalize `raw` into a [`Host`].  Returns `None` when nothing is left
    /// after trimming.
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = raw.trim().trim_end_matches('.').to_ascii_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for IPv4 dotted quads and bracketed IPv6 literals.
    pub fn is_ip_literal(&self) -> bool {
        self.0.starts_with('[') || self.0.parse::<std::net::Ipv4Addr>().is_ok()
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable set of whitelisted hosts.
pub type WhitelistSet = BTreeSet<Host>;

/// Effective whitelist derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "hosts", rename_all = "snake_case")]
pub enum WhitelistMode {
    /// No host restriction.
    Disabled,
    /// Navigation restricted to these hosts and their subdomains.  May be
    /// empty when only auto-enrolled hosts were expected and none parsed.
    Enabled(WhitelistSet),
}

impl WhitelistMode {
    pub fn is_enabled(&self) -> bool {
        matches!(self, WhitelistMode::Enabled(_))
    }
}

/// Raw whitelist value as supplied by the configuration loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WhitelistSetting {
    /// `true` whitelists only the start URL and bookmark hosts.
    Flag(bool),
    /// Explicit hosts, auto-enrolled hosts are added on top.
    Hosts(Vec<String>),
}

/// A single top-level navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub url: String,
    /// New window or popup (e.g. `target="_blank"`, `window.open()`).
    pub is_popup: bool,
    /// MIME type, when the engine knows it before committing.
    pub mime_type: Option<String>,
}

impl NavigationRequest {
    /// Ordinary link navigation with no MIME hint.
    pub fn link(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_popup: false,
            mime_type: None,
        }
    }

    /// New-window request for `url`.
    pub fn popup(url: impl Into<String>) -> Self {
        Self {
            is_popup: true,
            ..Self::link(url)
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Why a navigation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    HostNotWhitelisted,
    PopupsDisabled,
    ExternalContentDisabled,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::HostNotWhitelisted => write!(f, "host_not_whitelisted"),
            DenyReason::PopupsDisabled => write!(f, "popups_disabled"),
            DenyReason::ExternalContentDisabled => write!(f, "external_content_disabled"),
        }
    }
}

/// Outcome of evaluating a [`NavigationRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum NavigationDecision {
    Allow,
    Deny(DenyReason),
}

impl NavigationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, NavigationDecision::Allow)
    }
}

/// What the kiosk does once the inactivity timeout fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutMode {
    /// Return to the start URL and clear history.
    #[default]
    Reset,
    /// Terminate the kiosk process.
    Close,
    /// Show the screensaver URL until the next activity.
    Screensaver,
}

impl FromStr for TimeoutMode {
    type Err = KioskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reset" => Ok(TimeoutMode::Reset),
            "close" => Ok(TimeoutMode::Close),
            "screensaver" => Ok(TimeoutMode::Screensaver),
            other => Err(KioskError::InvalidTimeoutMode(other.to_string())),
        }
    }
}

impl fmt::Display for TimeoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutMode::Reset => write!(f, "reset"),
            TimeoutMode::Close => write!(f, "close"),
            TimeoutMode::Screensaver => write!(f, "screensaver"),
        }
    }
}

/// Behaviour of the "finished" button on the navigation bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuitButtonMode {
    #[default]
    Reset,
    Close,
}

impl FromStr for QuitButtonMode {
    type Err = KioskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reset" => Ok(QuitButtonMode::Reset),
            "close" => Ok(QuitButtonMode::Close),
            other => Err(KioskError::InvalidQuitButtonMode(other.to_string())),
        }
    }
}

impl fmt::Display for QuitButtonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuitButtonMode::Reset => write!(f, "reset"),
            QuitButtonMode::Close => write!(f, "close"),
        }
    }
}

/// Idle sub-state entered when the timeout fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleMode {
    PendingReset,
    /// Terminal: the process has been asked to exit.
    PendingClose,
    Screensaver,
}

/// State occupied by the idle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "mode", rename_all = "snake_case")]
pub enum KioskState {
    #[default]
    Active,
    Idle(IdleMode),
}

impl fmt::Display for KioskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KioskState::Active => write!(f, "active"),
            KioskState::Idle(IdleMode::PendingReset) => write!(f, "idle (pending reset)"),
            KioskState::Idle(IdleMode::PendingClose) => write!(f, "idle (pending close)"),
            KioskState::Idle(IdleMode::Screensaver) => write!(f, "idle (screensaver)"),
        }
    }
}

/// Abstract UI command emitted towards the embedding layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "url", rename_all = "snake_case")]
pub enum KioskCommand {
    NavigateTo(String),
    ClearHistory,
    ShowNavigationBar,
    HideNavigationBar,
    Terminate,
}

impl fmt::Display for KioskCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KioskCommand::NavigateTo(url) => write!(f, "navigate-to {url}"),
            KioskCommand::ClearHistory => write!(f, "clear-history"),
            KioskCommand::ShowNavigationBar => write!(f, "show-navigation-bar"),
            KioskCommand::HideNavigationBar => write!(f, "hide-navigation-bar"),
            KioskCommand::Terminate => write!(f, "terminate"),
        }
    }
}

/// A navigation-bar bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub url: String,
    /// Button label; the bookmark key is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Inactivity timeout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Seconds without input before the timeout fires.  `0` disables it.
    pub timeout_seconds: u64,
    pub timeout_mode: TimeoutMode,
    /// Only used in [`TimeoutMode::Screensaver`].
    pub screensaver_url: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 0,
            timeout_mode: TimeoutMode::Reset,
            screensaver_url: DEFAULT_URL.to_string(),
        }
    }
}

impl TimeoutConfig {
    pub fn is_enabled(&self) -> bool {
        self.timeout_seconds > 0
    }
}

/// Default for `start_url` and `screensaver_url`.
pub const DEFAULT_URL: &str = "about:blank";

/// Validated, immutable kiosk configuration.
///
/// Built once at startup by the configuration loader and handed by
/// reference to the whitelist builder, navigation guard, and idle state
/// machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KioskConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<WhitelistSetting>,
    pub start_url: String,
    /// Ordered by bookmark key.
    pub bookmarks: BTreeMap<String, Bookmark>,
    pub timeout: TimeoutConfig,
    pub allow_popups: bool,
    pub allow_external_content: bool,
    /// Whether the navigation bar is shown at all.
    pub navigation: bool,
    pub quit_button_mode: QuitButtonMode,
    /// MIME type → external program used for downloaded content.
    pub content_handlers: BTreeMap<String, String>,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            whitelist: None,
            start_url: DEFAULT_URL.to_string(),
            bookmarks: BTreeMap::new(),
            timeout: TimeoutConfig::default(),
            allow_popups: false,
            allow_external_content: false,
            navigation: true,
            quit_button_mode: QuitButtonMode::Reset,
            content_handlers: BTreeMap::new(),
        }
    }
}

/// Non-fatal configuration problem.  Reported and skipped, never returned
/// as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum ConfigWarning {
    /// A URL whose host could not be extracted; `source` names the option.
    UnparseableUrl { source: String, url: String },
    /// A whitelist entry that normalized to nothing.
    EmptyWhitelistEntry { entry: String },
    /// A whitelist entry that is not a host, `host:port`, IP literal or URL.
    InvalidWhitelistEntry { entry: String },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::UnparseableUrl { source, url } => {
                write!(f, "{source}: no host in URL {url:?}, not whitelisted")
            }
            ConfigWarning::EmptyWhitelistEntry { entry } => {
                write!(f, "whitelist: ignoring empty entry {entry:?}")
            }
            ConfigWarning::InvalidWhitelistEntry { entry } => {
                write!(f, "whitelist: ignoring entry {entry:?}, not a valid host")
            }
        }
    }
}

/// Configuration errors.  Nothing in the policy engine itself fails at
/// runtime; these only surface while building a [`KioskConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KioskError {
    #[error("Invalid timeout_mode {0:?}: expected reset, close or screensaver")]
    InvalidTimeoutMode(String),

    #[error("Invalid quit_button_mode {0:?}: expected reset or close")]
    InvalidQuitButtonMode(String),

    #[error("Invalid whitelist: {0}")]
    InvalidWhitelist(String),

    #[error("Failed to read config at {path}: {details}")]
    ConfigIo { path: String, details: String },

    #[error("Failed to parse config: {0}")]
    ConfigParse(String),
}
