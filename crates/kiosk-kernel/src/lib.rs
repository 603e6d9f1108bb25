//! `kiosk-kernel` – Lock-down policy engine
//!
//! Decides whether a kiosk may navigate somewhere and what it should do when
//! nobody is using it.  It renders nothing and owns no windows; it returns
//! decisions and commands that the embedding front end carries out.
//!
//! # Modules
//!
//! - [`host_matcher`] – [`matches`][host_matcher::matches] and
//!   [`host_of`][host_matcher::host_of]: label-boundary whitelist matching
//!   and URL host extraction.
//! - [`whitelist`] – [`WhitelistBuilder`][whitelist::WhitelistBuilder]:
//!   derives the immutable [`WhitelistMode`][kiosk_types::WhitelistMode]
//!   from configuration, auto-enrolling the start URL and bookmark hosts.
//! - [`navigation_rules`] – [`NavigationRule`][navigation_rules::NavigationRule]
//!   and the popup, external-content and whitelist rules.
//! - [`navigation_guard`] – [`NavigationGuard`][navigation_guard::NavigationGuard]:
//!   the single call the rendering engine makes before committing any
//!   top-level navigation.
//! - [`activity_monitor`] – [`ActivityMonitor`][activity_monitor::ActivityMonitor]:
//!   lock-free last-input timestamp.
//! - [`idle_state_machine`] – [`IdleStateMachine`][idle_state_machine::IdleStateMachine]:
//!   turns idle time into reset, close, or screensaver commands.

pub mod activity_monitor;
pub mod host_matcher;
pub mod idle_state_machine;
pub mod navigation_guard;
pub mod navigation_rules;
pub mod whitelist;

pub use activity_monitor::ActivityMonitor;
pub use host_matcher::{host_of, matches};
pub use idle_state_machine::IdleStateMachine;
pub use navigation_guard::{NavigationGuard, NavigationPolicy, decide};
pub use navigation_rules::{ExternalContentRule, NavigationRule, PopupRule, WhitelistRule};
pub use whitelist::WhitelistBuilder;
