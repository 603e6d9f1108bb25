//! End-to-end scenarios: configuration in, decisions and commands out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use kiosk_kernel::{
    ActivityMonitor, IdleStateMachine, NavigationGuard, NavigationPolicy, WhitelistBuilder,
    decide,
};
use kiosk_types::{
    Bookmark, DenyReason, Host, IdleMode, KioskCommand, KioskConfig, KioskState,
    NavigationDecision, NavigationRequest, TimeoutMode, WhitelistMode, WhitelistSetting,
};

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn library_config() -> KioskConfig {
    let mut cfg = KioskConfig {
        whitelist: Some(WhitelistSetting::Flag(true)),
        start_url: "http://example.com/kiosk".into(),
        ..KioskConfig::default()
    };
    cfg.bookmarks.insert(
        "Catalog".into(),
        Bookmark {
            url: "http://bm.org/x".into(),
            name: None,
            description: Some("Library catalog".into()),
        },
    );
    cfg
}

#[test]
fn whitelist_true_enrolls_start_and_bookmark_hosts() {
    let expected: std::collections::BTreeSet<Host> = ["example.com", "bm.org"]
        .iter()
        .filter_map(|h| Host::new(h))
        .collect();
    assert_eq!(
        WhitelistBuilder::build(&library_config()),
        WhitelistMode::Enabled(expected)
    );
}

#[test]
fn locked_down_kiosk_browsing_session() {
    let guard = NavigationGuard::from_config(&library_config());

    let allowed = [
        "http://example.com/kiosk",
        "https://www.example.com/events",
        "http://bm.org/x?page=2",
        "http://search.bm.org/",
        "about:blank",
    ];
    for url in allowed {
        assert!(guard.decide(&NavigationRequest::link(url)).is_allowed(), "{url}");
    }

    let denied = [
        "http://foo-example.com/",
        "http://example.com.evil.net/",
        "http://bm.org.evil.net/",
        "javascript:alert(1)",
        "about:config",
        r"http://evil.net\@example.com/",
    ];
    for url in denied {
        assert_eq!(
            guard.decide(&NavigationRequest::link(url)),
            NavigationDecision::Deny(DenyReason::HostNotWhitelisted),
            "{url}"
        );
    }
}

#[test]
fn disabled_whitelist_allows_any_host() {
    let cfg = KioskConfig {
        whitelist: Some(WhitelistSetting::Flag(false)),
        ..library_config()
    };
    let whitelist = WhitelistBuilder::build(&cfg);
    assert_eq!(whitelist, WhitelistMode::Disabled);

    let policy = NavigationPolicy::from_config(&cfg);
    for url in ["http://anywhere.net/", "https://10.1.2.3/admin", "http://foo-example.com/"] {
        assert_eq!(
            decide(&NavigationRequest::link(url), &whitelist, policy),
            NavigationDecision::Allow
        );
    }
}

#[test]
fn popups_disabled_wins_over_everything() {
    for whitelist in [WhitelistMode::Disabled, WhitelistBuilder::build(&library_config())] {
        let req = NavigationRequest::popup("http://example.com/kiosk").with_mime_type("text/html");
        assert_eq!(
            decide(&req, &whitelist, NavigationPolicy::default()),
            NavigationDecision::Deny(DenyReason::PopupsDisabled)
        );
    }
}

#[test]
fn reset_mode_scenario() {
    let mut cfg = library_config();
    cfg.timeout.timeout_seconds = 10;
    cfg.timeout.timeout_mode = TimeoutMode::Reset;

    let t0 = Instant::now();
    let monitor = Arc::new(ActivityMonitor::new(t0));
    let mut machine = IdleStateMachine::new(&cfg, Arc::clone(&monitor));

    // Timer ticks every half second for 15 simulated seconds.
    let mut emitted = Vec::new();
    for half_seconds in 1..=30 {
        emitted.extend(machine.tick(t0 + Duration::from_millis(half_seconds * 500)));
    }
    assert_eq!(
        emitted,
        vec![
            KioskCommand::NavigateTo("http://example.com/kiosk".into()),
            KioskCommand::ClearHistory,
        ]
    );
    assert_eq!(machine.state(), KioskState::Idle(IdleMode::PendingReset));

    assert!(machine.record_activity(t0 + secs(15)).is_empty());
    assert_eq!(machine.state(), KioskState::Active);
}

#[test]
fn close_mode_scenario() {
    let mut cfg = library_config();
    cfg.timeout.timeout_seconds = 10;
    cfg.timeout.timeout_mode = TimeoutMode::Close;

    let t0 = Instant::now();
    let mut machine = IdleStateMachine::new(&cfg, Arc::new(ActivityMonitor::new(t0)));

    let mut emitted = Vec::new();
    for n in 1..=20 {
        emitted.extend(machine.tick(t0 + secs(n)));
    }
    assert_eq!(emitted, vec![KioskCommand::Terminate]);

    assert!(machine.record_activity(t0 + secs(21)).is_empty());
    assert!(machine.tick(t0 + secs(40)).is_empty());
    assert_eq!(machine.state(), KioskState::Idle(IdleMode::PendingClose));
}

#[test]
fn screensaver_redirect_passes_the_guard() {
    let mut cfg = library_config();
    cfg.timeout.timeout_seconds = 30;
    cfg.timeout.timeout_mode = TimeoutMode::Screensaver;
    cfg.timeout.screensaver_url = "http://slides.city.gov/lobby".into();

    let guard = NavigationGuard::from_config(&cfg);
    let t0 = Instant::now();
    let mut machine = IdleStateMachine::new(&cfg, Arc::new(ActivityMonitor::new(t0)));

    let commands = machine.tick(t0 + secs(30));
    let targets: Vec<&str> = commands
        .iter()
        .filter_map(|c| match c {
            KioskCommand::NavigateTo(url) => Some(url.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(targets, vec!["http://slides.city.gov/lobby"]);
    for url in targets {
        assert!(guard.decide(&NavigationRequest::link(url)).is_allowed());
    }

    // The screensaver host itself is not whitelisted for ordinary browsing.
    assert!(!guard
        .decide(&NavigationRequest::link("http://slides.city.gov/admin"))
        .is_allowed());
}

#[test]
fn timer_and_input_threads_share_the_monitor() {
    let mut cfg = library_config();
    cfg.timeout.timeout_seconds = 5;
    cfg.timeout.timeout_mode = TimeoutMode::Screensaver;

    let t0 = Instant::now();
    let monitor = Arc::new(ActivityMonitor::new(t0));
    let mut machine = IdleStateMachine::new(&cfg, Arc::clone(&monitor));
    assert_eq!(machine.tick(t0 + secs(6)).len(), 2);

    let input = {
        let monitor = Arc::clone(&monitor);
        std::thread::spawn(move || monitor.record_activity(t0 + secs(7)))
    };
    input.join().expect("input thread panicked");

    assert_eq!(
        machine.tick(t0 + secs(7)).last(),
        Some(&KioskCommand::NavigateTo("http://example.com/kiosk".into()))
    );
    assert_eq!(machine.state(), KioskState::Active);
}
