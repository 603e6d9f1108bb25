//! [`NavigationGuard`] – single chokepoint between the rendering engine and
//! any top-level page load.
//!
//! Before the engine commits a navigation (link click, script redirect,
//! bookmark, address bar, back/forward) or opens a new browsing context for a
//! popup, it must call [`NavigationGuard::decide`].  Checks run in a fixed
//! order and the first failure wins:
//!
//! 1. **Popups** – a popup request is refused unless `allow_popups`.
//! 2. **External content** – a known non-HTML MIME type is refused unless
//!    `allow_external_content`.
//! 3. **Whitelist** – when the whitelist is enabled the target host must
//!    match it.
//!
//! A [`NavigationDecision::Deny`] is an ordinary result, not an error: the
//! caller shows its error page and stays where it was.
//!
//! # Example
//!
//! ```
//! use kiosk_kernel::{NavigationGuard, NavigationPolicy};
//! use kiosk_types::{DenyReason, Host, NavigationDecision, NavigationRequest, WhitelistMode};
//!
//! let whitelist = WhitelistMode::Enabled([Host::new("example.com").unwrap()].into());
//! let guard = NavigationGuard::new(whitelist, NavigationPolicy::default());
//!
//! assert_eq!(
//!     guard.decide(&NavigationRequest::link("https://shop.example.com/")),
//!     NavigationDecision::Allow,
//! );
//! assert_eq!(
//!     guard.decide(&NavigationRequest::link("https://elsewhere.net/")),
//!     NavigationDecision::Deny(DenyReason::HostNotWhitelisted),
//! );
//! ```

use std::collections::{BTreeMap, BTreeSet};

use kiosk_types::{KioskConfig, NavigationDecision, NavigationRequest, WhitelistMode};
use tracing::{debug, info};

use crate::navigation_rules::{
    ExternalContentRule, NavigationRule, PopupRule, WhitelistRule, evaluate, is_html_mime,
};
use crate::whitelist::WhitelistBuilder;

/// Popup and external-content switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationPolicy {
    pub allow_popups: bool,
    pub allow_external_content: bool,
}

impl NavigationPolicy {
    pub fn from_config(config: &KioskConfig) -> Self {
        Self {
            allow_popups: config.allow_popups,
            allow_external_content: config.allow_external_content,
        }
    }
}

/// Decide a single request against `whitelist` and `policy` without
/// constructing a [`NavigationGuard`].  No URL is trusted.
pub fn decide(
    request: &NavigationRequest,
    whitelist: &WhitelistMode,
    policy: NavigationPolicy,
) -> NavigationDecision {
    let trusted = BTreeSet::new();
    decide_with(request, whitelist, &trusted, policy)
}

fn decide_with(
    request: &NavigationRequest,
    whitelist: &WhitelistMode,
    trusted_urls: &BTreeSet<String>,
    policy: NavigationPolicy,
) -> NavigationDecision {
    let popup = PopupRule {
        allow_popups: policy.allow_popups,
    };
    let external = ExternalContentRule {
        allow_external_content: policy.allow_external_content,
    };
    let hosts = WhitelistRule {
        whitelist,
        trusted_urls,
    };
    let rules: [&dyn NavigationRule; 3] = [&popup, &external, &hosts];

    let decision = evaluate(&rules, request);
    match decision {
        NavigationDecision::Allow => {
            debug!(url = %request.url, popup = request.is_popup, "navigation allowed");
        }
        NavigationDecision::Deny(reason) => {
            info!(url = %request.url, popup = request.is_popup, %reason, "navigation denied");
        }
    }
    decision
}

/// Immutable navigation policy built once from configuration.
///
/// `Send + Sync`; share it behind an `Arc` and call [`decide`](Self::decide)
/// concurrently from any number of navigation attempts.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    whitelist: WhitelistMode,
    policy: NavigationPolicy,
    trusted_urls: BTreeSet<String>,
    content_handlers: BTreeMap<String, String>,
}

impl NavigationGuard {
    /// Construct a guard from an already-built whitelist and policy.
    pub fn new(whitelist: WhitelistMode, policy: NavigationPolicy) -> Self {
        Self {
            whitelist,
            policy,
            trusted_urls: BTreeSet::new(),
            content_handlers: BTreeMap::new(),
        }
    }

    /// Build the whitelist from `config` and trust the configured start and
    /// screensaver URLs.
    pub fn from_config(config: &KioskConfig) -> Self {
        Self::from_config_with_whitelist(config, WhitelistBuilder::build(config))
    }

    /// Like [`from_config`](Self::from_config) with a whitelist the caller
    /// already built (e.g. to display its warnings).
    pub fn from_config_with_whitelist(config: &KioskConfig, whitelist: WhitelistMode) -> Self {
        let mut guard = Self::new(whitelist, NavigationPolicy::from_config(config))
            .with_trusted_url(&config.start_url)
            .with_trusted_url(&config.timeout.screensaver_url);
        guard.content_handlers = config
            .content_handlers
            .iter()
            .map(|(mime, program)| (mime.trim().to_ascii_lowercase(), program.clone()))
            .collect();
        guard
    }

    /// Exempt `url` (exact match) from the whitelist check.  Popup and
    /// external-content checks still apply.
    pub fn with_trusted_url(mut self, url: &str) -> Self {
        let url = url.trim();
        if !url.is_empty() {
            self.trusted_urls.insert(url.to_string());
        }
        self
    }

    pub fn whitelist(&self) -> &WhitelistMode {
        &self.whitelist
    }

    pub fn policy(&self) -> NavigationPolicy {
        self.policy
    }

    /// Evaluate `request`.  Never fails; refusals are returned as
    /// [`NavigationDecision::Deny`].
    pub fn decide(&self, request: &NavigationRequest) -> NavigationDecision {
        decide_with(request, &self.whitelist, &self.trusted_urls, self.policy)
    }

    /// External program configured for `mime_type`.
    ///
    /// Only meaningful once [`decide`](Self::decide) has allowed a request
    /// carrying non-HTML content.  Returns `None` for HTML types, when
    /// external content is disabled, or when no handler is configured.
    pub fn handler_for(&self, mime_type: &str) -> Option<&str> {
        if !self.policy.allow_external_content || is_html_mime(mime_type) {
            return None;
        }
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.content_handlers.get(&essence).map(String::as_str)
    }
}
