//! Bounded log store with admission control
//!
//! This module provides the LogStore which keeps structured log entries in a
//! capacity-limited FIFO buffer, applies level/category/rate admission rules,
//! sanitizes payloads and removes entries past the retention period.

use crate::config::LoggingConfig;
use crate::events::{LogCategory, LogEntry, LogLevel, Timestamp};
use crate::store::{RateLimiter, Sanitizer};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Criteria for reading entries back out of the store
///
/// All provided criteria must match. The level criterion is at-or-above, not
/// an exact match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    pub level: Option<LogLevel>,
    pub category: Option<LogCategory>,
    /// Inclusive lower bound on the entry timestamp
    pub since: Option<Timestamp>,
}

impl EntryFilter {
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn category(mut self, category: LogCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn since(mut self, since: Timestamp) -> Self {
        self.since = Some(since);
        self
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.level.map_or(true, |level| entry.level >= level)
            && self.category.map_or(true, |category| entry.category == category)
            && self.since.map_or(true, |since| entry.timestamp >= since)
    }
}

/// Counts over the stored entries
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    pub total_entries: usize,
    pub by_level: BTreeMap<LogLevel, usize>,
    pub by_category: BTreeMap<LogCategory, usize>,
    pub error_count: usize,
    pub warning_count: usize,
}

/// Result of one retention sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub entries_removed: usize,
    pub windows_removed: usize,
}

/// Bounded, append-only store of log entries
///
/// Entries are kept in insertion order. When the buffer exceeds `max_entries`
/// the oldest entries are dropped, and entries older than the retention period
/// are removed by [`LogStore::cleanup`].
#[derive(Debug)]
pub struct LogStore {
    /// Stored entries, oldest first
    buffer: VecDeque<LogEntry>,
    /// Maximum number of stored entries
    max_entries: usize,
    /// Maximum age of stored entries
    retention: Duration,
    enabled: bool,
    min_level: LogLevel,
    categories: HashSet<LogCategory>,
    /// Per-key quota, absent when rate limiting is off
    rate_limiter: Option<RateLimiter>,
    sanitizer: Sanitizer,
    keep_stack_traces: bool,
    performance_tracking: bool,
    /// Monotonic start readings of running timers, in milliseconds
    timers: HashMap<String, f64>,
}

impl LogStore {
    /// Create a new LogStore from the logging configuration
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout::config::LoggingConfig;
    /// use lookout::store::LogStore;
    ///
    /// let store = LogStore::new(&LoggingConfig::default());
    /// assert!(store.is_empty());
    /// ```
    pub fn new(config: &LoggingConfig) -> Self {
        let rate_limiter = config
            .rate_limiting
            .enabled
            .then(|| RateLimiter::new(config.rate_limiting.max_per_minute));

        Self {
            buffer: VecDeque::with_capacity(config.max_entries.min(4096)),
            max_entries: config.max_entries,
            retention: config.retention(),
            enabled: config.enabled,
            min_level: config.level,
            categories: config.categories.iter().copied().collect(),
            rate_limiter,
            sanitizer: Sanitizer::new(&config.sanitization),
            keep_stack_traces: config.enable_error_stack_traces,
            performance_tracking: config.enable_performance_tracking,
            timers: HashMap::new(),
        }
    }

    /// Whether an entry of this level and category would pass the static filters
    pub fn accepts(&self, level: LogLevel, category: LogCategory) -> bool {
        self.enabled && level >= self.min_level && self.categories.contains(&category)
    }

    /// Admit, sanitize and append an entry
    ///
    /// The entry's own timestamp is used for rate limiting. Rejected entries
    /// are dropped without any error.
    ///
    /// # Returns
    ///
    /// The stored entry, or `None` if it was not admitted
    pub fn append(&mut self, mut entry: LogEntry) -> Option<&LogEntry> {
        if !self.accepts(entry.level, entry.category) {
            return None;
        }

        if let Some(limiter) = self.rate_limiter.as_mut() {
            if !limiter.try_acquire(entry.level, entry.category, entry.timestamp) {
                return None;
            }
        }

        if let Some(data) = entry.data.take() {
            entry.data = Some(self.sanitizer.sanitize(data));
        }
        if !self.keep_stack_traces {
            if let Some(error) = entry.error.as_mut() {
                error.stack = None;
            }
        }

        self.buffer.push_back(entry);
        self.enforce_capacity();
        self.buffer.back()
    }

    /// Entries matching the filter, in insertion order
    pub fn entries(&self, filter: &EntryFilter) -> Vec<LogEntry> {
        self.buffer
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect()
    }

    /// Entries strictly newer than `cutoff`, in insertion order
    pub fn entries_after(&self, cutoff: Timestamp) -> Vec<LogEntry> {
        self.buffer
            .iter()
            .filter(|entry| entry.timestamp > cutoff)
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Count stored entries by level and category
    pub fn stats(&self) -> LogStats {
        let mut stats = LogStats {
            total_entries: self.buffer.len(),
            ..LogStats::default()
        };

        for entry in &self.buffer {
            *stats.by_level.entry(entry.level).or_insert(0) += 1;
            *stats.by_category.entry(entry.category).or_insert(0) += 1;
            match entry.level {
                LogLevel::Error => stats.error_count += 1,
                LogLevel::Warn => stats.warning_count += 1,
                _ => {}
            }
        }

        stats
    }

    /// Record the start of a timing keyed by `key`
    ///
    /// Restarting a running key overwrites its start reading.
    pub fn start_timing(&mut self, key: &str, monotonic_ms: f64) {
        if self.performance_tracking {
            self.timers.insert(key.to_string(), monotonic_ms);
        }
    }

    /// Stop a timing and return the elapsed milliseconds
    ///
    /// # Returns
    ///
    /// `None` if no timing with that key is running
    pub fn finish_timing(&mut self, key: &str, monotonic_ms: f64) -> Option<f64> {
        if !self.performance_tracking {
            return None;
        }
        let started = self.timers.remove(key)?;
        Some((monotonic_ms - started).max(0.0))
    }

    /// Number of timings currently running
    pub fn running_timings(&self) -> usize {
        self.timers.len()
    }

    /// Remove entries past retention and expired rate-limit windows
    pub fn cleanup(&mut self, now: Timestamp) -> CleanupReport {
        let cutoff = now - self.retention;
        let before = self.buffer.len();

        // Wall-clock stamps can step backwards, so scan the whole buffer
        self.buffer.retain(|entry| entry.timestamp >= cutoff);

        let windows_removed = self
            .rate_limiter
            .as_mut()
            .map_or(0, |limiter| limiter.sweep(now));

        CleanupReport {
            entries_removed: before - self.buffer.len(),
            windows_removed,
        }
    }

    /// Remove every stored entry
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Removes oldest entries while the buffer exceeds max_entries
    fn enforce_capacity(&mut self) {
        while self.buffer.len() > self.max_entries {
            self.buffer.pop_front();
        }
    }
}


// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::Utc;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    impl Arbitrary for LogLevel {
        fn arbitrary(g: &mut Gen) -> Self {
            *g.choose(&LogLevel::ALL).unwrap()
        }
    }

    impl Arbitrary for LogCategory {
        fn arbitrary(g: &mut Gen) -> Self {
            *g.choose(&LogCategory::ALL).unwrap()
        }
    }

    /// Generate a buffer capacity (1-100)
    #[derive(Debug, Clone)]
    struct BufferCapacity(usize);

    impl Arbitrary for BufferCapacity {
        fn arbitrary(g: &mut Gen) -> Self {
            let capacity = (u8::arbitrary(g) % 100 + 1) as usize;
            BufferCapacity(capacity)
        }
    }

    /// Generate a number of entries to add (may exceed capacity)
    #[derive(Debug, Clone)]
    struct EntryCount(usize);

    impl Arbitrary for EntryCount {
        fn arbitrary(g: &mut Gen) -> Self {
            let count = (u8::arbitrary(g) % 200 + 1) as usize;
            EntryCount(count)
        }
    }

    fn unlimited(max_entries: usize) -> LoggingConfig {
        let mut config = LoggingConfig {
            level: LogLevel::Trace,
            max_entries,
            ..LoggingConfig::default()
        };
        config.rate_limiting.enabled = false;
        config
    }

    // The buffer never exceeds capacity and always keeps the newest entries
    #[quickcheck]
    fn prop_buffer_is_bounded_and_keeps_newest(
        capacity: BufferCapacity,
        count: EntryCount,
    ) -> bool {
        let mut store = LogStore::new(&unlimited(capacity.0));
        let now = Utc::now();

        for i in 0..count.0 {
            let entry = LogEntry::new(
                LogLevel::Info,
                LogCategory::Hierarchy,
                format!("entry {}", i),
                now + Duration::milliseconds(i as i64),
            );
            store.append(entry);
        }

        let entries = store.entries(&EntryFilter::default());
        let expected_len = count.0.min(capacity.0);
        let first_kept = count.0 - expected_len;

        entries.len() == expected_len
            && entries
                .iter()
                .enumerate()
                .all(|(offset, entry)| entry.message == format!("entry {}", first_kept + offset))
    }

    // A level filter only returns entries at or above that level, and all of them
    #[quickcheck]
    fn prop_level_filter_is_at_or_above(levels: Vec<LogLevel>, threshold: LogLevel) -> bool {
        let mut store = LogStore::new(&unlimited(1000));
        let now = Utc::now();

        for level in &levels {
            store.append(LogEntry::new(*level, LogCategory::System, "x", now));
        }

        let filtered = store.entries(&EntryFilter::default().level(threshold));
        let expected = levels.iter().filter(|level| **level >= threshold).count();

        filtered.iter().all(|entry| entry.level >= threshold) && filtered.len() == expected
    }

    // Category filtering returns exactly the stored entries of that category
    #[quickcheck]
    fn prop_category_filter_is_exact(categories: Vec<LogCategory>, wanted: LogCategory) -> bool {
        let mut store = LogStore::new(&unlimited(1000));
        let now = Utc::now();

        for category in &categories {
            store.append(LogEntry::new(LogLevel::Info, *category, "x", now));
        }

        let filtered = store.entries(&EntryFilter::default().category(wanted));
        filtered.len() == categories.iter().filter(|c| **c == wanted).count()
            && filtered.iter().all(|entry| entry.category == wanted)
    }
}
