//! Periodic hierarchy performance summaries
//!
//! Raw update measurements accumulate between reports; each report folds them
//! into a single `hierarchy_performance_summary` event so the collaborator sees
//! one call per interval instead of one per update.

use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::classifier::{compare_trend, TrendDirection};
use crate::aggregator::Metric;
use crate::events::{DataMap, Timestamp};
use crate::stats;
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

/// Name of the summary event
pub const SUMMARY_EVENT: &str = "hierarchy_performance_summary";

/// Samples buffered between summaries unless configured otherwise
pub const DEFAULT_MAX_SAMPLES: usize = 1000;

/// One raw hierarchy update measurement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSample {
    pub update_type: String,
    pub duration_ms: f64,
}

/// Aggregated content of one summary event
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HierarchySummary {
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
    pub total_updates: usize,
    pub by_update_type: BTreeMap<String, usize>,
    pub trend: TrendDirection,
}

/// Accumulates update samples and emits summaries
#[derive(Debug)]
pub struct PerformanceReporter {
    samples: VecDeque<UpdateSample>,
    min_samples: usize,
    /// Oldest samples are dropped beyond this many
    max_samples: usize,
    /// Stability threshold for the trend against the previous summary, in percent
    stable_threshold_percent: f64,
    previous_mean: Option<f64>,
}

impl PerformanceReporter {
    /// Create a reporter
    ///
    /// # Arguments
    ///
    /// * `min_samples` - Samples required before a summary is emitted
    /// * `stable_threshold_percent` - Change in mean below which the trend is stable
    pub fn new(min_samples: usize, stable_threshold_percent: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            min_samples,
            max_samples: DEFAULT_MAX_SAMPLES.max(min_samples),
            stable_threshold_percent,
            previous_mean: None,
        }
    }

    /// Bound the sample buffer; never below the minimum needed for a summary
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples.max(self.min_samples).max(1);
        self
    }

    pub fn record(&mut self, update_type: impl Into<String>, duration_ms: f64) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(UpdateSample {
            update_type: update_type.into(),
            duration_ms,
        });
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Fold the accumulated samples into a summary
    ///
    /// Returns `None` and keeps accumulating while fewer than `min_samples`
    /// samples are buffered.
    pub fn flush(&mut self) -> Option<HierarchySummary> {
        if self.samples.is_empty() || self.samples.len() < self.min_samples {
            return None;
        }

        let samples = std::mem::take(&mut self.samples);
        let durations: Vec<f64> = samples.iter().map(|s| s.duration_ms).collect();

        let mut by_update_type = BTreeMap::new();
        for sample in &samples {
            *by_update_type.entry(sample.update_type.clone()).or_insert(0) += 1;
        }

        let mean = stats::mean(&durations).unwrap_or(0.0);
        let trend = match self.previous_mean {
            Some(previous) => {
                compare_trend(
                    Metric::UpdateTime,
                    previous,
                    mean,
                    self.stable_threshold_percent,
                )
                .direction
            }
            None => TrendDirection::Stable,
        };
        self.previous_mean = Some(mean);

        Some(HierarchySummary {
            mean,
            median: stats::median(&durations).unwrap_or(0.0),
            p95: stats::percentile(&durations, 95.0).unwrap_or(0.0),
            total_updates: samples.len(),
            by_update_type,
            trend,
        })
    }

    /// Flush and send a summary to the sink, if one is due
    ///
    /// Sink failures are logged and swallowed.
    ///
    /// # Returns
    ///
    /// `true` if a summary was handed to the sink
    pub fn report(&mut self, sink: &dyn AnalyticsSink, now: Timestamp) -> bool {
        let Some(summary) = self.flush() else {
            debug!(
                "Skipping performance summary, {} of {} samples collected",
                self.samples.len(),
                self.min_samples
            );
            return false;
        };

        let properties = match serde_json::to_value(&summary) {
            Ok(Value::Object(map)) => map,
            Ok(_) => DataMap::new(),
            Err(e) => {
                warn!("Failed to serialize performance summary: {}", e);
                return false;
            }
        };

        match sink.track(AnalyticsEvent::new(SUMMARY_EVENT, properties, now)) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to report performance summary: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::MockAnalyticsSink;
    use crate::error::AnalyticsError;
    use chrono::Utc;

    #[test]
    fn test_no_summary_below_minimum() {
        let mut reporter = PerformanceReporter::new(5, 10.0);
        for _ in 0..4 {
            reporter.record("move", 10.0);
        }

        assert!(reporter.flush().is_none());
        // Samples keep accumulating until the minimum is reached
        assert_eq!(reporter.sample_count(), 4);

        reporter.record("move", 10.0);
        assert!(reporter.flush().is_some());
        assert_eq!(reporter.sample_count(), 0);
    }

    #[test]
    fn test_summary_statistics() {
        let mut reporter = PerformanceReporter::new(5, 10.0);
        for (kind, duration) in [
            ("move", 10.0),
            ("move", 20.0),
            ("reparent", 30.0),
            ("move", 40.0),
            ("delete", 50.0),
        ] {
            reporter.record(kind, duration);
        }

        let summary = reporter.flush().unwrap();

        assert_eq!(summary.mean, 30.0);
        assert_eq!(summary.median, 30.0);
        assert_eq!(summary.p95, 50.0);
        assert_eq!(summary.total_updates, 5);
        assert_eq!(summary.by_update_type["move"], 3);
        assert_eq!(summary.by_update_type["reparent"], 1);
        assert_eq!(summary.trend, TrendDirection::Stable);
    }

    #[test]
    fn test_buffer_keeps_newest_samples() {
        let mut reporter = PerformanceReporter::new(2, 10.0).with_max_samples(3);
        for duration in [1.0, 2.0, 3.0, 4.0, 5.0] {
            reporter.record("move", duration);
        }
        assert_eq!(reporter.sample_count(), 3);

        let summary = reporter.flush().unwrap();
        assert_eq!(summary.total_updates, 3);
        assert_eq!(summary.mean, 4.0);
    }

    #[test]
    fn test_max_samples_never_below_minimum() {
        let mut reporter = PerformanceReporter::new(5, 10.0).with_max_samples(2);
        for _ in 0..5 {
            reporter.record("move", 10.0);
        }
        assert!(reporter.flush().is_some());
    }

    #[test]
    fn test_trend_against_previous_summary() {
        let mut reporter = PerformanceReporter::new(1, 10.0);

        reporter.record("move", 100.0);
        reporter.flush().unwrap();

        reporter.record("move", 150.0);
        assert_eq!(reporter.flush().unwrap().trend, TrendDirection::Up);

        reporter.record("move", 149.0);
        assert_eq!(reporter.flush().unwrap().trend, TrendDirection::Stable);

        reporter.record("move", 50.0);
        assert_eq!(reporter.flush().unwrap().trend, TrendDirection::Down);
    }

    #[test]
    fn test_report_sends_one_summary_event() {
        let mut sink = MockAnalyticsSink::new();
        sink.expect_track()
            .withf(|event| {
                event.name == SUMMARY_EVENT
                    && event.properties["totalUpdates"] == 5
                    && event.properties.contains_key("byUpdateType")
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut reporter = PerformanceReporter::new(5, 10.0);
        for _ in 0..5 {
            reporter.record("move", 12.0);
        }

        assert!(reporter.report(&sink, Utc::now()));
        // Nothing left to report
        assert!(!reporter.report(&sink, Utc::now()));
    }

    #[test]
    fn test_report_swallows_sink_failure() {
        let mut sink = MockAnalyticsSink::new();
        sink.expect_track()
            .times(1)
            .returning(|_| Err(AnalyticsError::SendFailed("collector down".to_string())));

        let mut reporter = PerformanceReporter::new(1, 10.0);
        reporter.record("move", 12.0);

        assert!(!reporter.report(&sink, Utc::now()));
    }
}
