//! Time sources for the log store and timers
//!
//! Wall-clock timestamps stamp entries; the monotonic reading measures
//! durations. Tests swap in [`ManualClock`] to control both.

use crate::events::Timestamp;
use chrono::{Duration, Utc};
use std::sync::Mutex;
use std::time::Instant;

/// Source of wall-clock and monotonic time
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> Timestamp;

    /// Monotonic milliseconds since an arbitrary fixed origin
    fn monotonic_ms(&self) -> f64;
}

/// Clock backed by the system time and `Instant`
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn monotonic_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(Timestamp, f64)>,
}

impl ManualClock {
    /// Create a manual clock starting at the given wall-clock time
    pub fn new(start: Timestamp) -> Self {
        Self {
            state: Mutex::new((start, 0.0)),
        }
    }

    /// Move both the wall clock and the monotonic reading forward
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.0 += by;
        state.1 += by.num_microseconds().unwrap_or(i64::MAX) as f64 / 1000.0;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).0
    }

    fn monotonic_ms(&self) -> f64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).1
    }
}
