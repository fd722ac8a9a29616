//! Request instrumentation: named counters and timers.
//!
//! # Design
//! A [`MetricsRegistry`] hands out cheap clonable handles keyed by name, so
//! a client and the code observing it share the same underlying state.
//! Timers record through an RAII guard, which makes "every request is timed
//! exactly once" hold on every exit path, including early returns.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Registry of named instruments.
///
/// Cloning the registry, or asking twice for the same name, yields handles
/// sharing the same underlying counts.
#[derive(Clone, Debug, Default)]
pub struct MetricsRegistry {
    inner: Arc<Mutex<Instruments>>,
}

#[derive(Debug, Default)]
struct Instruments {
    counters: HashMap<String, Counter>,
    timers: HashMap<String, Timer>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the counter registered under `name`.
    pub fn counter(&self, name: &str) -> Counter {
        self.lock().counters.entry(name.to_string()).or_default().clone()
    }

    /// Get or create the timer registered under `name`.
    pub fn timer(&self, name: &str) -> Timer {
        self.lock().timers.entry(name.to_string()).or_default().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Instruments> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Monotonic event counter.
#[derive(Clone, Debug, Default)]
pub struct Counter {
    count: Arc<AtomicU64>,
}

impl Counter {
    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Accumulates how many times an operation ran and for how long.
#[derive(Clone, Debug, Default)]
pub struct Timer {
    state: Arc<TimerState>,
}

#[derive(Debug, Default)]
struct TimerState {
    count: AtomicU64,
    total_nanos: AtomicU64,
}

impl Timer {
    /// Start one measurement; it is recorded when the guard drops.
    pub fn start(&self) -> TimerGuard {
        TimerGuard {
            timer: self.clone(),
            started: Instant::now(),
        }
    }

    /// Number of completed measurements.
    pub fn count(&self) -> u64 {
        self.state.count.load(Ordering::Relaxed)
    }

    /// Total time across all completed measurements.
    pub fn total_elapsed(&self) -> Duration {
        Duration::from_nanos(self.state.total_nanos.load(Ordering::Relaxed))
    }

    fn record(&self, elapsed: Duration) {
        self.state.count.fetch_add(1, Ordering::Relaxed);
        self.state
            .total_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }
}

/// In-flight measurement started by [`Timer::start`].
#[must_use = "dropping the guard is what records the measurement"]
pub struct TimerGuard {
    timer: Timer,
    started: Instant,
}

impl TimerGuard {
    /// Time elapsed since the measurement started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.timer.record(self.started.elapsed());
    }
}
