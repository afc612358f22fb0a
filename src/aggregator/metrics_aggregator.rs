//! Snapshot computation over the aggregation window
//!
//! Every cycle rescans the entries inside the window instead of updating
//! running totals. The store's capacity and the window length bound the scan.

use crate::aggregator::PerformanceSnapshot;
use crate::events::{LogCategory, LogEntry, LogLevel, Timestamp};
use crate::stats;
use chrono::Duration;

/// Substring marking performance entries that measure a render
const RENDER_MARKER: &str = "render";

/// Compute a fresh snapshot from the given entries
///
/// Only entries strictly newer than `now - window` count. Durations come from
/// the numeric `duration` payload field; entries without one are left out of
/// the averages entirely rather than counted as zero.
///
/// # Arguments
///
/// * `entries` - Candidate entries, typically the full store contents
/// * `now` - Reference time for the window
/// * `window` - Length of the aggregation window
/// * `memory_usage` - Reading from the host memory probe, if any
pub fn compute_snapshot<'a, I>(
    entries: I,
    now: Timestamp,
    window: Duration,
    memory_usage: Option<f64>,
) -> PerformanceSnapshot
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let cutoff = now - window;

    let mut total = 0usize;
    let mut errors = 0usize;
    let mut hierarchy = 0usize;
    let mut update_durations = Vec::new();
    let mut render_durations = Vec::new();

    for entry in entries.into_iter().filter(|e| e.timestamp > cutoff) {
        total += 1;

        if entry.level == LogLevel::Error {
            errors += 1;
        }

        match entry.category {
            LogCategory::Hierarchy => hierarchy += 1,
            LogCategory::Performance => {
                if let Some(duration) = entry.duration() {
                    update_durations.push(duration);
                    if entry.message.contains(RENDER_MARKER) {
                        render_durations.push(duration);
                    }
                }
            }
            _ => {}
        }
    }

    let window_minutes = window.num_milliseconds() as f64 / 60_000.0;
    let update_frequency = if window_minutes > 0.0 {
        hierarchy as f64 / window_minutes
    } else {
        0.0
    };

    let error_rate = if total == 0 {
        0.0
    } else {
        errors as f64 / total as f64 * 100.0
    };

    PerformanceSnapshot {
        update_frequency,
        avg_update_time: stats::mean(&update_durations).unwrap_or(0.0),
        p95_update_time: stats::percentile(&update_durations, 95.0).unwrap_or(0.0),
        error_rate,
        response_time: stats::mean(&render_durations).unwrap_or(0.0),
        memory_usage,
        sample_size: total,
        timestamp: now,
    }
}
