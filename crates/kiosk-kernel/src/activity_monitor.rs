//! [`ActivityMonitor`] – last-input timestamp.
//!
//! The input layer calls [`ActivityMonitor::record_activity`] on every mouse
//! move, key press, or touch.  The idle state machine asks
//! [`ActivityMonitor::idle_duration`] on each timer tick.
//!
//! The timestamp is a single atomic offset from the monitor's creation
//! instant, so input and timer threads can share one monitor through an
//! `Arc` without a lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// ────────────────────────────────────────────────────────────────────────────
// ActivityMonitor
// ────────────────────────────────────────────────────────────────────────────

/// Tracks when user input was last seen.
///
/// All timestamps come from the monotonic [`Instant`] clock and are passed
/// in explicitly, which keeps the monitor deterministic under test.
///
/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
/// use kiosk_kernel::ActivityMonitor;
///
/// let start = Instant::now();
/// let monitor = ActivityMonitor::new(start);
///
/// monitor.record_activity(start + Duration::from_secs(3));
/// assert_eq!(
///     monitor.idle_duration(start + Duration::from_secs(10)),
///     Duration::from_secs(7),
/// );
/// ```
#[derive(Debug)]
pub struct ActivityMonitor {
    origin: Instant,
    /// Nanoseconds from `origin` to the most recent activity.
    last_activity: AtomicU64,
}

impl ActivityMonitor {
    /// Create a monitor whose last activity is `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            origin: now,
            last_activity: AtomicU64::new(0),
        }
    }

    /// Record user input at `now`.
    ///
    /// Out-of-order timestamps from a racing thread never move the last
    /// activity backwards.  Recording the same instant twice is a no-op.
    pub fn record_activity(&self, now: Instant) {
        self.last_activity
            .fetch_max(self.offset_of(now), Ordering::AcqRel);
    }

    /// Instant of the most recent recorded activity.
    pub fn last_activity(&self) -> Instant {
        self.origin + Duration::from_nanos(self.last_activity.load(Ordering::Acquire))
    }

    /// Time elapsed between the last activity and `now`.  Zero when `now`
    /// precedes the last activity.
    pub fn idle_duration(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity())
    }

    fn offset_of(&self, now: Instant) -> u64 {
        u64::try_from(now.saturating_duration_since(self.origin).as_nanos()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn fresh_monitor_is_not_idle() {
        let t0 = Instant::now();
        let monitor = ActivityMonitor::new(t0);
        assert_eq!(monitor.idle_duration(t0), Duration::ZERO);
        assert_eq!(monitor.last_activity(), t0);
    }

    #[test]
    fn idle_duration_grows_with_time() {
        let t0 = Instant::now();
        let monitor = ActivityMonitor::new(t0);
        assert_eq!(monitor.idle_duration(t0 + secs(5)), secs(5));
        assert_eq!(monitor.idle_duration(t0 + secs(90)), secs(90));
    }

    #[test]
    fn activity_resets_idle_duration() {
        let t0 = Instant::now();
        let monitor = ActivityMonitor::new(t0);
        monitor.record_activity(t0 + secs(8));
        assert_eq!(monitor.idle_duration(t0 + secs(10)), secs(2));
    }

    #[test]
    fn recording_same_instant_twice_is_idempotent() {
        let t0 = Instant::now();
        let monitor = ActivityMonitor::new(t0);
        monitor.record_activity(t0 + secs(4));
        let before = monitor.idle_duration(t0 + secs(4));
        monitor.record_activity(t0 + secs(4));
        assert_eq!(monitor.idle_duration(t0 + secs(4)), before);
        assert_eq!(before, Duration::ZERO);
    }

    #[test]
    fn stale_activity_does_not_move_backwards() {
        let t0 = Instant::now();
        let monitor = ActivityMonitor::new(t0);
        monitor.record_activity(t0 + secs(10));
        monitor.record_activity(t0 + secs(3));
        assert_eq!(monitor.last_activity(), t0 + secs(10));
    }

    #[test]
    fn query_before_last_activity_saturates_to_zero() {
        let t0 = Instant::now();
        let monitor = ActivityMonitor::new(t0);
        monitor.record_activity(t0 + secs(10));
        assert_eq!(monitor.idle_duration(t0 + secs(5)), Duration::ZERO);
    }

    #[test]
    fn concurrent_recording_keeps_latest() {
        let t0 = Instant::now();
        let monitor = Arc::new(ActivityMonitor::new(t0));
        let handles: Vec<_> = (1..=8)
            .map(|i| {
                let monitor = Arc::clone(&monitor);
                thread::spawn(move || monitor.record_activity(t0 + secs(i)))
            })
            .collect();
        for handle in handles {
            handle.join().expect("recorder thread panicked");
        }
        assert_eq!(monitor.last_activity(), t0 + secs(8));
    }
}
