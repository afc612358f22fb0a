use crate::events::{LogCategory, LogLevel, Timestamp};
use chrono::Duration;
use std::collections::HashMap;

/// Admission counter for one (level, category) key
#[derive(Debug, Clone, Copy, PartialEq)]
struct RateWindow {
    count: usize,
    reset_at: Timestamp,
}

/// Fixed-window rate limiter for log writes
///
/// Keeps one counter per (level, category) pair. The first write of a window
/// opens a 60 second window; further writes inside it are admitted until the
/// counter reaches `max_per_minute`. Writes straddling a window boundary can
/// therefore admit up to twice the quota within one real minute.
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum number of writes admitted per key per window
    max_per_minute: usize,
    /// Open windows keyed by (level, category)
    windows: HashMap<(LogLevel, LogCategory), RateWindow>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RateLimiter {
    /// Length of one admission window
    pub const WINDOW_SECONDS: i64 = 60;

    /// Create a new rate limiter with the given per-key quota
    ///
    /// # Arguments
    ///
    /// * `max_per_minute` - Maximum number of writes admitted per key per window
    pub fn new(max_per_minute: usize) -> Self {
        Self {
            max_per_minute,
            windows: HashMap::new(),
        }
    }

    /// Decide whether a write for the key is admitted at `now`
    ///
    /// Admission is recorded immediately, so a `true` result consumes quota.
    pub fn try_acquire(&mut self, level: LogLevel, category: LogCategory, now: Timestamp) -> bool {
        let window = self.windows.entry((level, category)).or_insert(RateWindow {
            count: 0,
            reset_at: now,
        });

        if window.count == 0 || now > window.reset_at {
            *window = RateWindow {
                count: 1,
                reset_at: now + Duration::seconds(Self::WINDOW_SECONDS),
            };
            return true;
        }

        if window.count >= self.max_per_minute {
            return false;
        }

        window.count += 1;
        true
    }

    /// Number of writes admitted in the key's current window
    pub fn current_count(&self, level: LogLevel, category: LogCategory, now: Timestamp) -> usize {
        match self.windows.get(&(level, category)) {
            Some(window) if now <= window.reset_at => window.count,
            _ => 0,
        }
    }

    /// Drop windows that have expired by `now`
    ///
    /// # Returns
    ///
    /// Number of windows removed
    pub fn sweep(&mut self, now: Timestamp) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| now <= window.reset_at);
        before - self.windows.len()
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
