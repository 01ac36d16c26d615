use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// User action invoked on every firing
pub(crate) type SharedCallback = Arc<Mutex<Box<dyn FnMut() + Send + 'static>>>;

/// How often a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerMode {
    /// Fires once and removes itself
    OneShot,
    /// Fires every interval; `0` repeats until removed, `n > 0` stops after `n` firings
    Repeating(u32),
}

impl TimerMode {
    /// Maps an optional repetition count onto a mode.
    ///
    /// `None` is a one-shot timer, `Some(0)` repeats forever and `Some(n)`
    /// fires `n` times.
    pub fn from_reps(reps: Option<u32>) -> Self {
        match reps {
            None => TimerMode::OneShot,
            Some(n) => TimerMode::Repeating(n),
        }
    }

    /// Number of firings before the timer expires, `None` when unbounded
    pub fn total_reps(&self) -> Option<u32> {
        match self {
            TimerMode::OneShot => Some(1),
            TimerMode::Repeating(0) => None,
            TimerMode::Repeating(n) => Some(*n),
        }
    }
}

/// A spawned driver task, cancelled when dropped
#[derive(Debug)]
pub(crate) struct ScheduledTask {
    token: CancellationToken,
}

impl ScheduledTask {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Registry-side state of one tracked timer
pub(crate) struct TimerEntry {
    /// Serial that survives pause/resume but not re-creation
    pub instance: u64,
    /// Start of the interval in progress
    pub start_time: Instant,
    /// Nominal delay between firings
    pub duration: Duration,
    /// Delay used for the next firing after an arm
    pub current_duration: Duration,
    pub mode: TimerMode,
    pub reps_left: u32,
    pub callback: SharedCallback,
    /// `None` while paused
    pub task: Option<ScheduledTask>,
}

impl TimerEntry {
    pub(crate) fn new(
        instance: u64,
        duration: Duration,
        mode: TimerMode,
        callback: SharedCallback,
    ) -> Self {
        TimerEntry {
            instance,
            start_time: Instant::now(),
            duration,
            current_duration: duration,
            mode,
            reps_left: mode.total_reps().unwrap_or(0),
            callback,
            task: None,
        }
    }

    /// Release the scheduled task, leaving the entry registered
    pub(crate) fn disarm(&mut self) {
        self.task = None;
    }

    /// Whole seconds until the nominal end of the current interval.
    ///
    /// Rounds half up and may go negative once the interval has overrun.
    pub(crate) fn seconds_left(&self, now: Instant) -> i64 {
        let elapsed = now.saturating_duration_since(self.start_time);
        round_half_up(self.duration.as_secs_f64() - elapsed.as_secs_f64())
    }
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
