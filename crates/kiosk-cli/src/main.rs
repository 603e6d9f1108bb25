//! `kiosk-cli` – Kiosk policy shell
//!
//! This binary is the reference embedding of the kiosk policy engine.  It:
//!
//! 1. Loads and validates the configuration (file, `KIOSK_*` environment,
//!    command-line switches).  An invalid `timeout_mode` aborts startup.
//! 2. Builds the navigation guard and reports whitelist warnings.
//! 3. Starts the idle state machine with a background timer.
//! 4. Drops the operator into an **interactive shell** that plays the part of
//!    the browser: navigation checks, simulated input, status.
//! 5. Intercepts **Ctrl-C** to exit.

mod args;
mod config;
mod repl;

use clap::Parser;
use colored::Colorize;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

use kiosk_kernel::{ActivityMonitor, IdleStateMachine, NavigationGuard, WhitelistBuilder};
use kiosk_types::WhitelistMode;

fn main() {
    let cli = args::CliArgs::parse();

    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG wins; otherwise "info", or "debug" with --debug.
    // Set KIOSK_LOG_FORMAT=json to emit newline-delimited JSON logs.
    let default_level = if cli.debug { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    if std::env::var("KIOSK_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let loaded = match config::load(cli.config.as_deref(), &cli.overrides()) {
        Ok(loaded) => loaded,
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            std::process::exit(1);
        }
    };
    match &loaded.source {
        Some(path) => println!("  Config loaded from {}", path.display().to_string().bold()),
        None => println!("  No config file found; using defaults."),
    }
    let cfg = loaded.config;
    info!(start_url = %cfg.start_url, timeout = cfg.timeout.timeout_seconds, "configuration loaded");

    // ── Navigation policy ─────────────────────────────────────────────────
    let (whitelist, warnings) = WhitelistBuilder::build_with_warnings(&cfg);
    for warning in &warnings {
        println!("  {} {}", "⚠".yellow(), warning);
    }
    match &whitelist {
        WhitelistMode::Disabled => println!("  Whitelist: {}", "disabled".dimmed()),
        WhitelistMode::Enabled(hosts) => {
            println!("  Whitelist: {} host(s)", hosts.len().to_string().bold());
        }
    }
    let guard = NavigationGuard::from_config_with_whitelist(&cfg, whitelist);

    // ── Idle handling ─────────────────────────────────────────────────────
    let monitor = Arc::new(ActivityMonitor::new(Instant::now()));
    let machine = IdleStateMachine::new(&cfg, monitor);
    match machine.timeout() {
        Some(t) => println!(
            "  Inactivity timeout: {}s ({})",
            t.as_secs(),
            cfg.timeout.timeout_mode
        ),
        None => println!("  Inactivity timeout: {}", "disabled".dimmed()),
    }

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    // The shell is blocked reading stdin, so Ctrl-C ends the process
    // directly instead of signalling the loop.
    if let Err(e) = ctrlc::set_handler(|| {
        println!();
        println!("{}", "⚠  Ctrl-C received – exiting kiosk shell …".yellow().bold());
        std::process::exit(130);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; Ctrl-C will use the default signal behaviour");
    }

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    let session = repl::Session {
        config: cfg,
        guard,
        machine: Arc::new(Mutex::new(machine)),
    };
    repl::run(session);
}

fn print_banner() {
    println!();
    println!("  {} {}",
        "Kiosk".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Lock-down policy shell");
    println!();
}
