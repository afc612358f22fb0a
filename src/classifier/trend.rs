//! Trend direction between two consecutive snapshots

use crate::aggregator::{Metric, PerformanceSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Floor for the previous value so a zero baseline does not divide by zero
const BASELINE_EPSILON: f64 = 1e-9;

/// Slack for floating-point noise when comparing against the stability threshold
const BOUNDARY_TOLERANCE: f64 = 1e-9;

/// Direction of change of one metric
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

/// Change of one metric between two snapshots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub metric: Metric,
    pub direction: TrendDirection,
    pub change_percent: f64,
}

/// Per-metric stability thresholds, in percent
///
/// Each metric has its own noise floor, so a change is only reported as a
/// trend once it moves by more than that metric's threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct TrendConfig(BTreeMap<Metric, f64>);

impl Default for TrendConfig {
    fn default() -> Self {
        let mut table = BTreeMap::new();
        table.insert(Metric::UpdateFrequency, 5.0);
        table.insert(Metric::UpdateTime, 10.0);
        table.insert(Metric::ErrorRate, 10.0);
        table.insert(Metric::ResponseTime, 10.0);
        table.insert(Metric::MemoryUsage, 5.0);
        Self(table)
    }
}

impl TrendConfig {
    /// Threshold used for metrics missing from the table
    pub const FALLBACK_PERCENT: f64 = 10.0;

    pub fn with(mut self, metric: Metric, percent: f64) -> Self {
        self.0.insert(metric, percent);
        self
    }

    pub fn stable_threshold(&self, metric: Metric) -> f64 {
        self.0
            .get(&metric)
            .copied()
            .unwrap_or(Self::FALLBACK_PERCENT)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.0.iter().map(|(metric, percent)| (*metric, *percent))
    }
}

/// Compare two readings of a metric
///
/// A change whose magnitude is at most `stable_threshold_percent` is stable.
pub fn compare_trend(
    metric: Metric,
    previous: f64,
    current: f64,
    stable_threshold_percent: f64,
) -> Trend {
    let change_percent = (current - previous) * 100.0 / previous.max(BASELINE_EPSILON);

    let direction = if change_percent.abs() <= stable_threshold_percent + BOUNDARY_TOLERANCE {
        TrendDirection::Stable
    } else if change_percent > 0.0 {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    };

    Trend {
        metric,
        direction,
        change_percent,
    }
}

/// Trends for every metric present in both snapshots
pub fn compute_trends(
    previous: &PerformanceSnapshot,
    current: &PerformanceSnapshot,
    config: &TrendConfig,
) -> Vec<Trend> {
    Metric::ALL
        .iter()
        .filter_map(|&metric| {
            let before = previous.value(metric)?;
            let after = current.value(metric)?;
            Some(compare_trend(
                metric,
                before,
                after,
                config.stable_threshold(metric),
            ))
        })
        .collect()
}
