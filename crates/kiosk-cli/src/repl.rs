//! REPL – interactive shell standing in for the kiosk's rendering and input
//! layers.
//!
//! Every entered line counts as user activity.  A background timer thread
//! ticks the idle state machine; emitted commands are printed as they
//! would be handed to the browser.
//!
//! Supported slash-commands:
//!   /help                                 – show this list
//!   /check <url> [--popup] [--mime <type>] – ask the navigation guard
//!   /activity                             – simulate a touch
//!   /quit-button                          – press the "finished" button
//!   /status [--json]                      – state and idle time
//!   /whitelist                            – effective whitelist
//!   /config                               – validated configuration
//!   /exit                                 – leave the shell

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use kiosk_kernel::{IdleStateMachine, NavigationGuard};
use kiosk_types::{KioskCommand, KioskConfig, NavigationDecision, NavigationRequest, WhitelistMode};
use tracing::debug;

/// Timer cadence for idle checks.
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Everything the shell needs, shared with the timer thread.
pub struct Session {
    pub config: KioskConfig,
    pub guard: NavigationGuard,
    pub machine: Arc<Mutex<IdleStateMachine>>,
}

/// Entry point for the interactive REPL.  Returns on `/exit`, EOF, or a
/// `Terminate` command, after stopping the timer thread.
pub fn run(session: Session) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let timer = spawn_timer(Arc::clone(&session.machine), Arc::clone(&shutdown));

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", "kiosk>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let cmd = line.trim();
        if cmd.is_empty() {
            continue;
        }

        // Typing is input: wake the kiosk before handling the command.
        let woke = lock(&session.machine).record_activity(Instant::now());
        if execute(&woke) {
            break;
        }

        let mut words = cmd.split_whitespace();
        match words.next().unwrap_or_default() {
            "/help" => cmd_help(),
            "/check" => cmd_check(&session, words.collect()),
            "/activity" => println!("  {}", "activity recorded".dimmed()),
            "/quit-button" => {
                let commands = lock(&session.machine).press_quit(Instant::now());
                if execute(&commands) {
                    break;
                }
            }
            "/status" => cmd_status(&session, words.any(|w| w == "--json")),
            "/whitelist" => cmd_whitelist(session.guard.whitelist()),
            "/config" => cmd_config(&session.config),
            "/exit" => {
                println!("{}", "Goodbye.".green());
                break;
            }
            other => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                );
            }
        }
    }

    shutdown.store(true, Ordering::SeqCst);
    if timer.join().is_err() {
        eprintln!("{}", "Timer thread panicked".red());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Timer
// ─────────────────────────────────────────────────────────────────────────────

fn spawn_timer(
    machine: Arc<Mutex<IdleStateMachine>>,
    shutdown: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !shutdown.load(Ordering::SeqCst) {
            thread::sleep(TICK_INTERVAL);
            let commands = lock(&machine).tick(Instant::now());
            if commands.is_empty() {
                continue;
            }
            println!();
            if execute(&commands) {
                // The shell is blocked on stdin; nothing else will stop it.
                std::process::exit(0);
            }
            print!("{} ", "kiosk>".bold().cyan());
            io::stdout().flush().ok();
        }
        debug!("idle timer stopped");
    })
}

/// Print `commands` the way the browser would receive them.  Returns `true`
/// when one of them is [`KioskCommand::Terminate`].
fn execute(commands: &[KioskCommand]) -> bool {
    let mut terminate = false;
    for command in commands {
        println!("  {} {}", "→".cyan(), command.to_string().bold());
        terminate |= *command == KioskCommand::Terminate;
    }
    if terminate {
        println!("{}", "Kiosk terminated.".yellow().bold());
    }
    terminate
}

/// Lock the machine, recovering from a poisoned mutex: the state is a plain
/// enum and stays consistent even if a holder panicked.
fn lock(machine: &Mutex<IdleStateMachine>) -> MutexGuard<'_, IdleStateMachine> {
    machine
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Kiosk Commands".bold().underline());
    println!("  {}  – ask the navigation guard", "/check <url> [--popup] [--mime <type>]".bold().cyan());
    println!("  {}                              – simulate user input", "/activity".bold().cyan());
    println!("  {}                           – press the finished button", "/quit-button".bold().cyan());
    println!("  {}                       – state and idle time", "/status [--json]".bold().cyan());
    println!("  {}                             – effective whitelist", "/whitelist".bold().cyan());
    println!("  {}                                – validated configuration", "/config".bold().cyan());
    println!("  {}                                  – exit the shell", "/exit".bold().cyan());
    println!();
}

/// Build a [`NavigationRequest`] from `/check` arguments.
pub(crate) fn parse_check(words: Vec<&str>) -> Result<NavigationRequest, String> {
    let mut words = words.into_iter();
    let url = words.next().ok_or("usage: /check <url> [--popup] [--mime <type>]")?;
    let mut request = NavigationRequest::link(url);
    while let Some(word) = words.next() {
        match word {
            "--popup" => request.is_popup = true,
            "--mime" => {
                let mime = words.next().ok_or("--mime requires a type")?;
                request = request.with_mime_type(mime);
            }
            other => return Err(format!("unknown /check option '{other}'")),
        }
    }
    Ok(request)
}

fn cmd_check(session: &Session, words: Vec<&str>) {
    let request = match parse_check(words) {
        Ok(request) => request,
        Err(e) => {
            println!("  {}", e.red());
            return;
        }
    };

    match session.guard.decide(&request) {
        NavigationDecision::Allow => {
            println!("  {} {}", "ALLOW".green().bold(), request.url);
            if let Some(mime) = request.mime_type.as_deref()
                && let Some(handler) = session.guard.handler_for(mime)
            {
                println!("  {} {}", "open with".dimmed(), handler.bold());
            }
        }
        NavigationDecision::Deny(reason) => {
            println!(
                "  {} {} ({})",
                "DENY".red().bold(),
                request.url,
                reason.to_string().yellow()
            );
        }
    }
}

fn cmd_status(session: &Session, json: bool) {
    let machine = lock(&session.machine);
    let idle = machine.monitor().idle_duration(Instant::now());

    let policy = session.guard.policy();
    let whitelist_enabled = session.guard.whitelist().is_enabled();

    if json {
        let status = serde_json::json!({
            "state": machine.state(),
            "idle_seconds": idle.as_secs_f64(),
            "timeout_seconds": machine.timeout().map(|t| t.as_secs()),
            "whitelist_enabled": whitelist_enabled,
            "allow_popups": policy.allow_popups,
            "allow_external_content": policy.allow_external_content,
        });
        match serde_json::to_string_pretty(&status) {
            Ok(s) => println!("{s}"),
            Err(e) => println!("{}: {}", "Serialization error".red(), e),
        }
        return;
    }

    println!("  State   : {}", machine.state().to_string().yellow());
    println!("  Idle    : {:.1}s", idle.as_secs_f64());
    match machine.timeout() {
        Some(t) => println!(
            "  Timeout : {}s ({})",
            t.as_secs(),
            session.config.timeout.timeout_mode
        ),
        None => println!("  Timeout : {}", "disabled".dimmed()),
    }
    println!("  Policy  : whitelist {}, popups {}, external content {}",
        on_off(whitelist_enabled),
        on_off(policy.allow_popups),
        on_off(policy.allow_external_content)
    );
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

fn cmd_whitelist(whitelist: &WhitelistMode) {
    match whitelist {
        WhitelistMode::Disabled => println!("  Whitelist {}", "disabled".dimmed()),
        WhitelistMode::Enabled(hosts) if hosts.is_empty() => {
            println!("  Whitelist enabled with {}", "no hosts".yellow());
        }
        WhitelistMode::Enabled(hosts) => {
            println!("  Whitelisted hosts (and their subdomains):");
            for host in hosts {
                println!("    • {}", host.as_str().bold());
            }
        }
    }
}

fn cmd_config(config: &KioskConfig) {
    match toml::to_string_pretty(config) {
        Ok(s) => println!("{s}"),
        Err(e) => println!("{}: {}", "Serialization error".red(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_parses_plain_url() {
        let req = parse_check(vec!["http://example.com/"]).unwrap();
        assert_eq!(req, NavigationRequest::link("http://example.com/"));
    }

    #[test]
    fn check_parses_popup_and_mime() {
        let req = parse_check(vec!["http://a.org/x.pdf", "--popup", "--mime", "application/pdf"])
            .unwrap();
        assert!(req.is_popup);
        assert_eq!(req.mime_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn check_requires_url_and_mime_value() {
        assert!(parse_check(vec![]).is_err());
        assert!(parse_check(vec!["http://a.org/", "--mime"]).is_err());
        assert!(parse_check(vec!["http://a.org/", "--sideways"]).is_err());
    }

    #[test]
    fn execute_reports_termination() {
        assert!(!execute(&[KioskCommand::ClearHistory]));
        assert!(execute(&[KioskCommand::Terminate]));
    }
}
