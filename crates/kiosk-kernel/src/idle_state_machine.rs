//! [`IdleStateMachine`] – kiosk inactivity handling.
//!
//! The machine starts in [`KioskState::Active`].  A timer calls
//! [`IdleStateMachine::tick`] at a regular cadence (sub-second is plenty);
//! once the [`ActivityMonitor`] reports at least `timeout_seconds` without
//! input, the configured [`TimeoutMode`] fires exactly once:
//!
//! | Mode | Commands on timeout | Next state |
//! |---|---|---|
//! | `reset` | `NavigateTo(start_url)`, `ClearHistory` | `Idle(PendingReset)` |
//! | `close` | `Terminate` | `Idle(PendingClose)` (terminal) |
//! | `screensaver` | `HideNavigationBar`, `NavigateTo(screensaver_url)` | `Idle(Screensaver)` |
//!
//! The reset happens when the timeout fires, so the next activity in
//! `Idle(PendingReset)` only re-arms the machine.  Activity during the
//! screensaver shows the navigation bar again and returns to `start_url`.
//! Navigation-bar commands are only emitted when the bar is configured.
//!
//! A `timeout_seconds` of `0` makes the machine inert: it never leaves
//! `Active`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use kiosk_types::{IdleMode, KioskCommand, KioskConfig, KioskState, QuitButtonMode, TimeoutMode};
use tracing::{debug, info};

use crate::activity_monitor::ActivityMonitor;

/// Drives [`KioskState`] from activity and elapsed time.
///
/// Owned by one control path; wrap it in a `Mutex` if activity and timer
/// events arrive on different threads.  The shared [`ActivityMonitor`] may
/// also be fed directly from an input thread: the next [`tick`](Self::tick)
/// notices the activity and wakes the machine.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
/// use kiosk_kernel::{ActivityMonitor, IdleStateMachine};
/// use kiosk_types::{IdleMode, KioskCommand, KioskConfig, KioskState};
///
/// let mut cfg = KioskConfig::default();
/// cfg.start_url = "http://example.com/".into();
/// cfg.timeout.timeout_seconds = 10;
///
/// let t0 = Instant::now();
/// let mut machine = IdleStateMachine::new(&cfg, Arc::new(ActivityMonitor::new(t0)));
///
/// assert!(machine.tick(t0 + Duration::from_secs(5)).is_empty());
/// assert_eq!(
///     machine.tick(t0 + Duration::from_secs(10)),
///     vec![
///         KioskCommand::NavigateTo("http://example.com/".into()),
///         KioskCommand::ClearHistory,
///     ],
/// );
/// assert_eq!(machine.state(), KioskState::Idle(IdleMode::PendingReset));
/// ```
pub struct IdleStateMachine {
    /// `None` when the timeout is disabled.
    timeout: Option<Duration>,
    mode: TimeoutMode,
    quit_button_mode: QuitButtonMode,
    start_url: String,
    screensaver_url: String,
    navigation_bar: bool,
    monitor: Arc<ActivityMonitor>,
    state: KioskState,
    idle_since: Option<Instant>,
}

impl IdleStateMachine {
    pub fn new(config: &KioskConfig, monitor: Arc<ActivityMonitor>) -> Self {
        let timeout = config
            .timeout
            .is_enabled()
            .then(|| Duration::from_secs(config.timeout.timeout_seconds));
        Self {
            timeout,
            mode: config.timeout.timeout_mode,
            quit_button_mode: config.quit_button_mode,
            start_url: config.start_url.clone(),
            screensaver_url: config.timeout.screensaver_url.clone(),
            navigation_bar: config.navigation,
            monitor,
            state: KioskState::Active,
            idle_since: None,
        }
    }

    pub fn state(&self) -> KioskState {
        self.state
    }

    /// `true` once a `Terminate` command has been emitted.
    pub fn is_terminated(&self) -> bool {
        self.state == KioskState::Idle(IdleMode::PendingClose)
    }

    pub fn monitor(&self) -> &Arc<ActivityMonitor> {
        &self.monitor
    }

    /// Configured timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Timer check.  Fires the timeout once, wakes the machine if activity
    /// was recorded on the monitor since going idle, otherwise does nothing.
    pub fn tick(&mut self, now: Instant) -> Vec<KioskCommand> {
        let Some(timeout) = self.timeout else {
            return Vec::new();
        };
        match self.state {
            KioskState::Active => {
                if self.monitor.idle_duration(now) >= timeout {
                    self.enter_idle(now)
                } else {
                    Vec::new()
                }
            }
            KioskState::Idle(IdleMode::PendingClose) => Vec::new(),
            KioskState::Idle(_) => {
                if self.activity_since_idle() {
                    self.wake()
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Record user input at `now` and leave a non-terminal idle state.
    pub fn record_activity(&mut self, now: Instant) -> Vec<KioskCommand> {
        self.monitor.record_activity(now);
        match self.state {
            KioskState::Idle(IdleMode::PendingReset | IdleMode::Screensaver) => self.wake(),
            KioskState::Active | KioskState::Idle(IdleMode::PendingClose) => Vec::new(),
        }
    }

    /// The navigation bar's "finished" button.
    ///
    /// In `close` mode this terminates like a `close` timeout.  In `reset`
    /// mode it returns to `start_url` with a cleared history, leaving the
    /// screensaver first if it is showing.
    pub fn press_quit(&mut self, now: Instant) -> Vec<KioskCommand> {
        if self.is_terminated() {
            return Vec::new();
        }
        match self.quit_button_mode {
            QuitButtonMode::Close => {
                self.transition(KioskState::Idle(IdleMode::PendingClose), None);
                vec![KioskCommand::Terminate]
            }
            QuitButtonMode::Reset => {
                self.monitor.record_activity(now);
                let mut commands = Vec::new();
                if self.state == KioskState::Idle(IdleMode::Screensaver) && self.navigation_bar {
                    commands.push(KioskCommand::ShowNavigationBar);
                }
                commands.push(KioskCommand::NavigateTo(self.start_url.clone()));
                commands.push(KioskCommand::ClearHistory);
                self.transition(KioskState::Active, None);
                commands
            }
        }
    }

    fn enter_idle(&mut self, now: Instant) -> Vec<KioskCommand> {
        let (mode, commands) = match self.mode {
            TimeoutMode::Reset => (
                IdleMode::PendingReset,
                vec![
                    KioskCommand::NavigateTo(self.start_url.clone()),
                    KioskCommand::ClearHistory,
                ],
            ),
            TimeoutMode::Close => (IdleMode::PendingClose, vec![KioskCommand::Terminate]),
            TimeoutMode::Screensaver => {
                let mut commands = Vec::with_capacity(2);
                if self.navigation_bar {
                    commands.push(KioskCommand::HideNavigationBar);
                }
                commands.push(KioskCommand::NavigateTo(self.screensaver_url.clone()));
                (IdleMode::Screensaver, commands)
            }
        };
        debug!(idle = ?self.monitor.idle_duration(now), "inactivity timeout fired");
        self.transition(KioskState::Idle(mode), Some(now));
        commands
    }

    fn wake(&mut self) -> Vec<KioskCommand> {
        let mut commands = Vec::new();
        if self.state == KioskState::Idle(IdleMode::Screensaver) {
            if self.navigation_bar {
                commands.push(KioskCommand::ShowNavigationBar);
            }
            commands.push(KioskCommand::NavigateTo(self.start_url.clone()));
        }
        self.transition(KioskState::Active, None);
        commands
    }

    fn activity_since_idle(&self) -> bool {
        self.idle_since
            .is_some_and(|since| self.monitor.last_activity() > since)
    }

    fn transition(&mut self, to: KioskState, idle_since: Option<Instant>) {
        if self.state != to {
            info!(from = %self.state, to = %to, "kiosk state transition");
        }
        self.state = to;
        self.idle_since = idle_since;
    }
}
