//! Ordered navigation checks.
//!
//! Each [`NavigationRule`] inspects a [`NavigationRequest`] and either lets it
//! through or names a [`DenyReason`].  [`evaluate`] runs rules in order and
//! the first refusal wins.
//!
//! Three built-in rules make up the kiosk policy:
//! - [`PopupRule`] – refuses new-window requests unless popups are allowed.
//! - [`ExternalContentRule`] – refuses non-HTML content unless external
//!   content is allowed.
//! - [`WhitelistRule`] – refuses hosts outside the whitelist.

use std::collections::BTreeSet;

use kiosk_types::{DenyReason, NavigationDecision, NavigationRequest, WhitelistMode};

use crate::host_matcher::{host_of, matches};

// ────────────────────────────────────────────────────────────────────────────
// Rule trait
// ────────────────────────────────────────────────────────────────────────────

/// A single condition a navigation must satisfy.
pub trait NavigationRule: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// `Ok(())` when `request` passes, otherwise the reason it is refused.
    fn check(&self, request: &NavigationRequest) -> Result<(), DenyReason>;
}

/// Run `rules` in order, returning the first refusal as a
/// [`NavigationDecision::Deny`].
pub fn evaluate(rules: &[&dyn NavigationRule], request: &NavigationRequest) -> NavigationDecision {
    for rule in rules {
        if let Err(reason) = rule.check(request) {
            tracing::trace!(rule = rule.name(), %reason, "navigation rule refused request");
            return NavigationDecision::Deny(reason);
        }
    }
    NavigationDecision::Allow
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in rules
// ────────────────────────────────────────────────────────────────────────────

/// Refuses popup / new-window requests when `allow_popups` is off.
pub struct PopupRule {
    pub allow_popups: bool,
}

impl NavigationRule for PopupRule {
    fn name(&self) -> &str {
        "popups"
    }

    fn check(&self, request: &NavigationRequest) -> Result<(), DenyReason> {
        if request.is_popup && !self.allow_popups {
            Err(DenyReason::PopupsDisabled)
        } else {
            Ok(())
        }
    }
}

/// Refuses content with a known, non-HTML MIME type when
/// `allow_external_content` is off.  Requests without a MIME hint pass.
pub struct ExternalContentRule {
    pub allow_external_content: bool,
}

impl NavigationRule for ExternalContentRule {
    fn name(&self) -> &str {
        "external_content"
    }

    fn check(&self, request: &NavigationRequest) -> Result<(), DenyReason> {
        match request.mime_type.as_deref() {
            Some(mime) if !is_html_mime(mime) && !self.allow_external_content => {
                Err(DenyReason::ExternalContentDisabled)
            }
            _ => Ok(()),
        }
    }
}

/// Refuses hosts outside an enabled whitelist.
///
/// `about:blank` and the URLs in `trusted_urls` (configuration-supplied
/// targets such as the screensaver page) are always let through.  Any
/// other URL without a host is refused while the whitelist is enabled.
pub struct WhitelistRule<'a> {
    pub whitelist: &'a WhitelistMode,
    pub trusted_urls: &'a BTreeSet<String>,
}

impl NavigationRule for WhitelistRule<'_> {
    fn name(&self) -> &str {
        "whitelist"
    }

    fn check(&self, request: &NavigationRequest) -> Result<(), DenyReason> {
        let WhitelistMode::Enabled(hosts) = self.whitelist else {
            return Ok(());
        };
        let url = request.url.trim();
        if is_about_blank(url) || self.trusted_urls.contains(url) {
            return Ok(());
        }
        match host_of(url) {
            Some(host) if matches(hosts, &host) => Ok(()),
            _ => Err(DenyReason::HostNotWhitelisted),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// `true` for `text/html` and `application/xhtml+xml`, ignoring case and
/// parameters such as `; charset=utf-8`.
pub fn is_html_mime(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case("text/html") || essence.eq_ignore_ascii_case("application/xhtml+xml")
}

/// The empty page every browsing context starts on.  Other `about:` pages
/// (`about:config`, `about:settings`, ...) expose browser internals and get
/// no exemption.
fn is_about_blank(url: &str) -> bool {
    url.eq_ignore_ascii_case("about:blank")
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_types::{Host, WhitelistSet};

    fn whitelist(entries: &[&str]) -> WhitelistMode {
        WhitelistMode::Enabled(entries.iter().filter_map(|e| Host::new(e)).collect())
    }

    #[test]
    fn popup_rule_only_blocks_popups() {
        let rule = PopupRule { allow_popups: false };
        assert_eq!(
            rule.check(&NavigationRequest::popup("http://a.org/")),
            Err(DenyReason::PopupsDisabled)
        );
        assert!(rule.check(&NavigationRequest::link("http://a.org/")).is_ok());
        assert!(PopupRule { allow_popups: true }
            .check(&NavigationRequest::popup("http://a.org/"))
            .is_ok());
    }

    #[test]
    fn html_family_detection() {
        assert!(is_html_mime("text/html"));
        assert!(is_html_mime("TEXT/HTML; charset=UTF-8"));
        assert!(is_html_mime("application/xhtml+xml"));
        assert!(!is_html_mime("application/pdf"));
        assert!(!is_html_mime("text/plain"));
        assert!(!is_html_mime(""));
    }

    #[test]
    fn external_content_rule() {
        let rule = ExternalContentRule {
            allow_external_content: false,
        };
        let pdf = NavigationRequest::link("http://a.org/f.pdf").with_mime_type("application/pdf");
        assert_eq!(rule.check(&pdf), Err(DenyReason::ExternalContentDisabled));

        let html = NavigationRequest::link("http://a.org/").with_mime_type("text/html");
        assert!(rule.check(&html).is_ok());
        assert!(rule.check(&NavigationRequest::link("http://a.org/f.pdf")).is_ok());

        let permissive = ExternalContentRule {
            allow_external_content: true,
        };
        assert!(permissive.check(&pdf).is_ok());
    }

    #[test]
    fn whitelist_rule_disabled_allows_everything() {
        let trusted = BTreeSet::new();
        let rule = WhitelistRule {
            whitelist: &WhitelistMode::Disabled,
            trusted_urls: &trusted,
        };
        assert!(rule.check(&NavigationRequest::link("http://anything.net/")).is_ok());
        assert!(rule.check(&NavigationRequest::link("garbage")).is_ok());
    }

    #[test]
    fn whitelist_rule_enforces_hosts() {
        let wl = whitelist(&["example.com"]);
        let trusted = BTreeSet::new();
        let rule = WhitelistRule {
            whitelist: &wl,
            trusted_urls: &trusted,
        };
        assert!(rule.check(&NavigationRequest::link("https://www.example.com/")).is_ok());
        assert_eq!(
            rule.check(&NavigationRequest::link("https://evil.net/")),
            Err(DenyReason::HostNotWhitelisted)
        );
        assert_eq!(
            rule.check(&NavigationRequest::link("file:///etc/passwd")),
            Err(DenyReason::HostNotWhitelisted)
        );
    }

    #[test]
    fn about_blank_and_trusted_urls_bypass_the_whitelist() {
        let wl = WhitelistMode::Enabled(WhitelistSet::new());
        let trusted: BTreeSet<String> = ["http://slides.example.net/loop".to_string()].into();
        let rule = WhitelistRule {
            whitelist: &wl,
            trusted_urls: &trusted,
        };
        assert!(rule.check(&NavigationRequest::link("about:blank")).is_ok());
        assert!(rule.check(&NavigationRequest::link("ABOUT:blank")).is_ok());
        // Only the blank page is exempt.
        for url in ["about:config", "about:settings", "about:blank#x", "about:"] {
            assert_eq!(
                rule.check(&NavigationRequest::link(url)),
                Err(DenyReason::HostNotWhitelisted),
                "{url}"
            );
        }
        assert!(rule
            .check(&NavigationRequest::link("http://slides.example.net/loop"))
            .is_ok());
        // Trust is per URL, not per host.
        assert!(rule
            .check(&NavigationRequest::link("http://slides.example.net/other"))
            .is_err());
    }

    #[test]
    fn evaluate_returns_first_refusal() {
        let wl = whitelist(&["example.com"]);
        let trusted = BTreeSet::new();
        let popup = PopupRule { allow_popups: false };
        let external = ExternalContentRule {
            allow_external_content: false,
        };
        let hosts = WhitelistRule {
            whitelist: &wl,
            trusted_urls: &trusted,
        };
        let rules: [&dyn NavigationRule; 3] = [&popup, &external, &hosts];

        let req = NavigationRequest::popup("http://evil.net/").with_mime_type("application/zip");
        assert_eq!(
            evaluate(&rules, &req),
            NavigationDecision::Deny(DenyReason::PopupsDisabled)
        );

        let req = NavigationRequest::link("http://evil.net/").with_mime_type("application/zip");
        assert_eq!(
            evaluate(&rules, &req),
            NavigationDecision::Deny(DenyReason::ExternalContentDisabled)
        );

        assert_eq!(
            evaluate(&rules, &NavigationRequest::link("http://example.com/")),
            NavigationDecision::Allow
        );
        assert_eq!(evaluate(&[], &req), NavigationDecision::Allow);
    }
}
