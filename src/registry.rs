use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::entry::{ScheduledTask, SharedCallback, TimerEntry, TimerMode};
use crate::error::TimerError;

/// Registry of named one-shot and repeating callback timers
///
/// Cloning is cheap; every clone addresses the same set of timers. Timers are
/// spawned onto the Tokio runtime of the thread that creates or resumes them.
#[derive(Clone)]
pub struct TimerRegistry {
    shared: Arc<Shared>,
}

struct Shared {
    /// Instance name for logging
    name: String,

    /// Parent of every scheduled task's token
    root_token: CancellationToken,

    /// Timer storage: timer_id -> entry
    timers: Mutex<HashMap<String, TimerEntry>>,

    next_instance: AtomicU64,
}

/// Everything a scheduled task needs to fire its timer
struct Trampoline {
    registry: Weak<Shared>,
    id: Option<String>,
    instance: u64,
    mode: TimerMode,
    first_deadline: Instant,
    period: Duration,
    callback: SharedCallback,
    token: CancellationToken,
}

enum Flow {
    Continue,
    Stop,
}

fn label(id: Option<&str>) -> &str {
    id.unwrap_or("<untracked>")
}

impl TimerRegistry {
    /// Create a new, empty TimerRegistry
    ///
    /// # Arguments
    /// * `name` - Registry instance name
    /// * `cancel_token` - Cancelling it stops every timer of this registry
    pub fn new(name: String, cancel_token: CancellationToken) -> Self {
        log::info!("Timer registry '{}' created", name);

        TimerRegistry {
            shared: Arc::new(Shared {
                name,
                root_token: cancel_token.child_token(),
                timers: Mutex::new(HashMap::new()),
                next_instance: AtomicU64::new(1),
            }),
        }
    }

    /// Registry instance name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Create a timer, replacing any timer already registered under `id`
    ///
    /// A `None` or empty `id` creates an untracked timer: it fires normally
    /// but cannot be looked up, paused or removed.
    pub fn create<F>(
        &self,
        id: Option<&str>,
        duration: Duration,
        mode: TimerMode,
        callback: F,
    ) -> Result<(), TimerError>
    where
        F: FnMut() + Send + 'static,
    {
        let id = id.filter(|id| !id.is_empty());

        let mut replaced = None;
        let mut timers = self.shared.live_timers();

        if let Some(id) = id {
            if let Some(mut old) = timers.remove(id) {
                old.disarm();
                log::debug!("Timer '{}' replaced in registry '{}'", id, self.shared.name);
                replaced = Some(old);
            }
        }

        let instance = self.shared.next_instance.fetch_add(1, Ordering::Relaxed);
        let boxed: Box<dyn FnMut() + Send + 'static> = Box::new(callback);
        let callback: SharedCallback = Arc::new(Mutex::new(boxed));
        let mut entry = TimerEntry::new(instance, duration, mode, callback);

        let armed = if duration.is_zero() {
            Err(TimerError::ZeroDuration)
        } else {
            self.arm(id, &entry)
        };
        let token = armed.map_err(|e| {
            log::error!(
                "Failed to create timer '{}' in registry '{}': {}",
                label(id),
                self.shared.name,
                e
            );
            e
        })?;

        log::debug!(
            "Timer '{}' set in registry '{}' to fire every {:?} ({:?})",
            label(id),
            self.shared.name,
            duration,
            mode
        );

        if let Some(id) = id {
            entry.task = Some(ScheduledTask::new(token));
            timers.insert(id.to_string(), entry);
        }

        drop(timers);
        drop(replaced);
        Ok(())
    }

    /// Create an untracked one-shot timer
    pub fn simple<F>(&self, duration: Duration, callback: F) -> Result<(), TimerError>
    where
        F: FnMut() + Send + 'static,
    {
        self.create(None, duration, TimerMode::OneShot, callback)
    }

    /// Seconds left in the current interval of `id`, rounded
    ///
    /// Returns 0 for unknown timers. Measured against the nominal duration,
    /// so a paused or overrun timer can report a negative value.
    pub fn time_left(&self, id: &str) -> i64 {
        self.shared
            .live_timers()
            .get(id)
            .map_or(0, |entry| entry.seconds_left(Instant::now()))
    }

    /// Check whether `id` names a tracked timer, paused or not
    pub fn exists(&self, id: &str) -> bool {
        self.shared.live_timers().contains_key(id)
    }

    /// Remaining firings of a finite repeating timer
    pub fn reps_left(&self, id: &str) -> Option<u32> {
        let timers = self.shared.live_timers();
        let entry = timers.get(id)?;
        match entry.mode {
            TimerMode::Repeating(n) if n > 0 => Some(entry.reps_left),
            _ => None,
        }
    }

    /// Check whether `id` is registered but currently disarmed
    pub fn is_paused(&self, id: &str) -> bool {
        self.shared
            .live_timers()
            .get(id)
            .is_some_and(|entry| entry.task.is_none())
    }

    /// Number of tracked timers
    pub fn len(&self) -> usize {
        self.shared.live_timers().len()
    }

    /// Check whether no tracked timers are registered
    pub fn is_empty(&self) -> bool {
        self.shared.live_timers().is_empty()
    }

    /// Cancel a timer and forget it
    pub fn remove(&self, id: &str) {
        let removed = self.shared.live_timers().remove(id);
        if removed.is_some() {
            log::debug!("Timer '{}' removed from registry '{}'", id, self.shared.name);
        }
    }

    /// Disarm a timer, keeping it registered
    ///
    /// The time elapsed since the interval started becomes the delay used by
    /// the next [`resume`](Self::resume).
    pub fn pause(&self, id: &str) {
        let mut timers = self.shared.live_timers();
        let Some(entry) = timers.get_mut(id) else {
            return;
        };

        entry.current_duration = Instant::now().saturating_duration_since(entry.start_time);
        entry.disarm();

        log::debug!(
            "Timer '{}' paused in registry '{}' after {:?}",
            id,
            self.shared.name,
            entry.current_duration
        );
    }

    /// Re-arm a timer, first firing after the duration frozen by [`pause`](Self::pause)
    pub fn resume(&self, id: &str) -> Result<(), TimerError> {
        let mut timers = self.shared.live_timers();
        let Some(entry) = timers.get_mut(id) else {
            return Ok(());
        };

        entry.disarm();
        entry.start_time = Instant::now();

        let token = self.arm(Some(id), entry).map_err(|e| {
            log::error!(
                "Failed to resume timer '{}' in registry '{}': {}",
                id,
                self.shared.name,
                e
            );
            e
        })?;
        entry.task = Some(ScheduledTask::new(token));

        log::debug!(
            "Timer '{}' resumed in registry '{}', next firing in {:?}",
            id,
            self.shared.name,
            entry.current_duration
        );
        Ok(())
    }

    /// Cancel and forget every tracked timer
    pub fn cancel_all(&self) {
        let drained = std::mem::take(&mut *self.shared.live_timers());
        log::debug!(
            "Canceled all {} timer(s) in registry '{}'",
            drained.len(),
            self.shared.name
        );
    }

    /// Stop every timer, tracked or not, and refuse new ones
    pub fn shutdown(&self) {
        self.shared.root_token.cancel();
        let drained = std::mem::take(&mut *self.shared.timers.lock());
        log::info!(
            "Timer registry '{}' shut down, {} timer(s) dropped",
            self.shared.name,
            drained.len()
        );
    }

    /// Check whether the registry was shut down or its cancellation token fired
    pub fn is_shutdown(&self) -> bool {
        self.shared.root_token.is_cancelled()
    }

    /// Spawn the scheduled task for `entry`
    fn arm(&self, id: Option<&str>, entry: &TimerEntry) -> Result<CancellationToken, TimerError> {
        if self.shared.root_token.is_cancelled() {
            return Err(TimerError::Shutdown(self.shared.name.clone()));
        }
        let runtime = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;

        let token = self.shared.root_token.child_token();
        let trampoline = Trampoline {
            registry: Arc::downgrade(&self.shared),
            id: id.map(str::to_owned),
            instance: entry.instance,
            mode: entry.mode,
            first_deadline: entry.start_time + entry.current_duration,
            period: entry.duration,
            callback: entry.callback.clone(),
            token: token.clone(),
        };
        runtime.spawn(trampoline.run());

        Ok(token)
    }
}

impl Shared {
    /// Lock the timer map, first forgetting every timer if the registry was cancelled
    fn live_timers(&self) -> MutexGuard<'_, HashMap<String, TimerEntry>> {
        if self.root_token.is_cancelled() {
            let drained = std::mem::take(&mut *self.timers.lock());
            if !drained.is_empty() {
                log::info!(
                    "Timer registry '{}' cancelled, {} timer(s) dropped",
                    self.name,
                    drained.len()
                );
            }
        }
        self.timers.lock()
    }

    /// Run one firing of `trampoline`; `fired` counts firings of this task
    fn fire(&self, trampoline: &Trampoline, fired: u32) -> Flow {
        let id = trampoline.id.as_deref();

        {
            let mut timers = self.timers.lock();
            if trampoline.token.is_cancelled() {
                return Flow::Stop;
            }
            // One-shot timers are gone before their callback can look for them
            if let (TimerMode::OneShot, Some(id)) = (trampoline.mode, id) {
                timers.remove(id);
            }
        }

        log::debug!("Timer '{}' fired in registry '{}'", label(id), self.name);
        {
            let mut callback = trampoline.callback.lock();
            (&mut **callback)();
        }

        if trampoline.mode == TimerMode::OneShot {
            return Flow::Stop;
        }

        let Some(id) = id else {
            return match trampoline.mode.total_reps() {
                Some(total) if fired >= total => Flow::Stop,
                _ if trampoline.token.is_cancelled() => Flow::Stop,
                _ => Flow::Continue,
            };
        };

        let mut timers = self.timers.lock();
        // The callback may have removed or replaced its own timer
        let Some(entry) = timers
            .get_mut(id)
            .filter(|entry| entry.instance == trampoline.instance)
        else {
            return Flow::Stop;
        };

        entry.start_time = Instant::now();
        // Keep the elapsed time frozen if the callback paused its own timer
        if entry.task.is_some() {
            entry.current_duration = entry.duration;
        }

        let expired = match entry.mode {
            TimerMode::Repeating(n) if n > 0 => {
                entry.reps_left = entry.reps_left.saturating_sub(1);
                entry.reps_left == 0
            }
            _ => false,
        };

        if expired {
            let removed = timers.remove(id);
            drop(timers);
            drop(removed);
            log::debug!("Timer '{}' expired in registry '{}'", id, self.name);
            return Flow::Stop;
        }

        if trampoline.token.is_cancelled() {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.root_token.cancel();
        log::info!("Timer registry '{}' stopped", self.name);
    }
}

impl Trampoline {
    async fn run(self) {
        // Deadlines are fixed at arm time, so neither a late first poll nor a
        // slow callback shifts later firings
        let mut ticks = interval_at(self.first_deadline, self.period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut fired: u32 = 0;

        loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => break,

                _ = ticks.tick() => {}
            }

            let Some(shared) = self.registry.upgrade() else {
                break;
            };
            fired = fired.saturating_add(1);
            if let Flow::Stop = shared.fire(&self, fired) {
                break;
            }
        }
    }
}
