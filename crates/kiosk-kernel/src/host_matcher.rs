//! Host extraction and whitelist matching.
//!
//! A host matches a whitelist entry when it is equal to the entry or is a
//! strict subdomain of it, i.e. it ends with `"." + entry`.  A bare string
//! suffix is not enough: `foo-example.com` does not match `example.com`.
//! IP literals only ever match by exact equality.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use kiosk_kernel::host_matcher::{host_of, matches};
//! use kiosk_types::Host;
//!
//! let whitelist: BTreeSet<Host> = [Host::new("example.com").unwrap()].into();
//!
//! let host = host_of("https://Docs.Example.com:8443/guide").unwrap();
//! assert!(matches(&whitelist, &host));
//! assert!(!matches(&whitelist, &Host::new("foo-example.com").unwrap()));
//! ```

use std::net::Ipv6Addr;

use kiosk_types::{Host, WhitelistSet};

/// Return `true` when `host` is whitelisted by any entry in `whitelist`.
///
/// Both sides are [`Host`] values and therefore already lowercase, which
/// makes the comparison case-insensitive.
pub fn matches(whitelist: &WhitelistSet, host: &Host) -> bool {
    if whitelist.contains(host) {
        return true;
    }
    if host.is_ip_literal() {
        return false;
    }
    whitelist
        .iter()
        .filter(|entry| !entry.is_ip_literal())
        .any(|entry| is_subdomain_of(host.as_str(), entry.as_str()))
}

/// `host` is a strict subdomain of `parent`, separated by a full label
/// boundary.
fn is_subdomain_of(host: &str, parent: &str) -> bool {
    host.len() > parent.len()
        && host.ends_with(parent)
        && host.as_bytes()[host.len() - parent.len() - 1] == b'.'
}

/// Extract the [`Host`] from the authority component of `url`.
///
/// Returns `None` for URLs without a `scheme://authority` part (e.g.
/// `about:blank`, `mailto:` links, bare words), for empty authorities and
/// for hosts containing characters no browser accepts in a hostname.
/// Userinfo and port are discarded; bracketed IPv6 literals keep their
/// brackets.
///
/// A backslash ends the authority just like `/`, the way browsers read
/// `http:` and `https:` URLs, so `http://evil.net\@example.com/` yields
/// `evil.net`.
pub fn host_of(url: &str) -> Option<Host> {
    let (scheme, rest) = url.trim().split_once("://")?;
    let valid_scheme = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_scheme {
        return None;
    }

    let authority = rest
        .split(['/', '\\', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host_port)| host_port);

    let host = if host_port.starts_with('[') {
        let end = host_port.find(']')?;
        let (literal, port) = host_port.split_at(end + 1);
        if !(port.is_empty() || port.starts_with(':')) {
            return None;
        }
        literal
    } else {
        host_port.split(':').next().unwrap_or_default()
    };
    if !is_valid_host(host) {
        return None;
    }
    Host::new(host)
}

/// Rejects whitespace, control characters and the code points that cannot
/// appear in a hostname.  Brackets must enclose a valid IPv6 address.
fn is_valid_host(host: &str) -> bool {
    if let Some(literal) = host.strip_prefix('[') {
        return literal
            .strip_suffix(']')
            .is_some_and(|ip| ip.parse::<Ipv6Addr>().is_ok());
    }
    !host.chars().any(|c| {
        c.is_whitespace()
            || c.is_control()
            || matches!(
                c,
                '#' | '%' | '/' | ':' | '<' | '>' | '?' | '@' | '[' | '\\' | ']' | '^' | '|'
            )
    })
}
