//! [`WhitelistBuilder`] – derives the effective [`WhitelistMode`] from a
//! [`KioskConfig`].
//!
//! | `whitelist` value | Result |
//! |---|---|
//! | absent, `false`, `[]` | [`WhitelistMode::Disabled`] |
//! | `true` | `Enabled` with only auto-enrolled hosts |
//! | list of hosts | `Enabled` with the normalized list plus auto-enrolled hosts |
//!
//! Auto-enrollment adds the host of `start_url` and of every bookmark URL
//! whenever the whitelist is enabled.  URLs without a parseable host are
//! skipped and reported as [`ConfigWarning`]s; they never abort the build.

use std::net::Ipv6Addr;

use kiosk_types::{ConfigWarning, Host, KioskConfig, WhitelistMode, WhitelistSet, WhitelistSetting};
use tracing::{debug, warn};

use crate::host_matcher::host_of;

/// Builds the immutable whitelist once per configuration load.
///
/// # Example
///
/// ```
/// use kiosk_kernel::WhitelistBuilder;
/// use kiosk_types::{KioskConfig, WhitelistMode, WhitelistSetting};
///
/// let cfg = KioskConfig {
///     whitelist: Some(WhitelistSetting::Flag(true)),
///     start_url: "http://example.com/kiosk".into(),
///     ..KioskConfig::default()
/// };
///
/// match WhitelistBuilder::build(&cfg) {
///     WhitelistMode::Enabled(hosts) => assert_eq!(hosts.len(), 1),
///     WhitelistMode::Disabled => unreachable!(),
/// }
/// ```
pub struct WhitelistBuilder;

impl WhitelistBuilder {
    /// Build the whitelist, logging any skipped entries.
    pub fn build(config: &KioskConfig) -> WhitelistMode {
        Self::build_with_warnings(config).0
    }

    /// Build the whitelist and also return the non-fatal problems found.
    pub fn build_with_warnings(config: &KioskConfig) -> (WhitelistMode, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();

        let mut hosts = match &config.whitelist {
            None | Some(WhitelistSetting::Flag(false)) => {
                return (WhitelistMode::Disabled, warnings);
            }
            Some(WhitelistSetting::Hosts(entries)) if entries.is_empty() => {
                return (WhitelistMode::Disabled, warnings);
            }
            Some(WhitelistSetting::Flag(true)) => WhitelistSet::new(),
            Some(WhitelistSetting::Hosts(entries)) => entries
                .iter()
                .filter_map(|entry| {
                    normalize_entry(entry)
                        .map_err(|warning| warnings.push(warning))
                        .ok()
                })
                .collect(),
        };

        enroll(&mut hosts, &mut warnings, "start_url", &config.start_url);
        for (key, bookmark) in &config.bookmarks {
            enroll(
                &mut hosts,
                &mut warnings,
                &format!("bookmarks.{key}"),
                &bookmark.url,
            );
        }

        for warning in &warnings {
            warn!(%warning, "whitelist entry skipped");
        }
        debug!(
            hosts = ?hosts.iter().map(Host::as_str).collect::<Vec<_>>(),
            "generated whitelist"
        );

        (WhitelistMode::Enabled(hosts), warnings)
    }
}

fn enroll(hosts: &mut WhitelistSet, warnings: &mut Vec<ConfigWarning>, source: &str, url: &str) {
    match host_of(url) {
        Some(host) => {
            hosts.insert(host);
        }
        None => warnings.push(ConfigWarning::UnparseableUrl {
            source: source.to_string(),
            url: url.to_string(),
        }),
    }
}

/// Normalize an explicit whitelist entry.
///
/// Accepts bare hosts (`example.com`), `host:port`, wildcard spellings
/// (`*.example.com`, `.example.com`), IP literals with or without IPv6
/// brackets, and full URLs.  Everything goes through [`host_of`] so that an
/// entry yields exactly the host a navigation to it would.
fn normalize_entry(entry: &str) -> Result<Host, ConfigWarning> {
    let trimmed = entry.trim();
    if trimmed.is_empty() {
        return Err(ConfigWarning::EmptyWhitelistEntry {
            entry: entry.to_string(),
        });
    }

    let host = if trimmed.contains("://") {
        host_of(trimmed)
    } else {
        let bare = strip_wildcard(trimmed);
        if bare.parse::<Ipv6Addr>().is_ok() {
            host_of(&format!("http://[{bare}]/"))
        } else {
            host_of(&format!("http://{bare}/"))
        }
    };

    host.and_then(|host| Host::new(strip_wildcard(host.as_str())))
        .ok_or_else(|| ConfigWarning::InvalidWhitelistEntry {
            entry: entry.to_string(),
        })
}

fn strip_wildcard(entry: &str) -> &str {
    entry
        .strip_prefix("*.")
        .or_else(|| entry.strip_prefix('.'))
        .unwrap_or(entry)
}
