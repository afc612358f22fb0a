//! Snapshot and threshold types shared by the aggregator, classifier and alerts

use crate::events::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Statistics derived from one aggregation cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    /// Hierarchy events per minute over the aggregation window
    pub update_frequency: f64,
    /// Mean duration of performance entries, in milliseconds
    pub avg_update_time: f64,
    /// 95th percentile of the same durations, in milliseconds
    pub p95_update_time: f64,
    /// Share of error-level entries, in percent
    pub error_rate: f64,
    /// Mean duration of render measurements, in milliseconds
    pub response_time: f64,
    /// Resident memory in megabytes, when a probe is available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<f64>,
    /// Number of entries inside the window
    pub sample_size: usize,
    pub timestamp: Timestamp,
}

impl PerformanceSnapshot {
    /// Snapshot with every statistic at zero
    pub fn empty(timestamp: Timestamp) -> Self {
        Self {
            update_frequency: 0.0,
            avg_update_time: 0.0,
            p95_update_time: 0.0,
            error_rate: 0.0,
            response_time: 0.0,
            memory_usage: None,
            sample_size: 0,
            timestamp,
        }
    }

    /// Value of a metric in this snapshot
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::UpdateFrequency => Some(self.update_frequency),
            Metric::UpdateTime => Some(self.avg_update_time),
            Metric::ErrorRate => Some(self.error_rate),
            Metric::ResponseTime => Some(self.response_time),
            Metric::MemoryUsage => self.memory_usage,
        }
    }
}

/// A monitored metric of the snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    UpdateFrequency,
    UpdateTime,
    ErrorRate,
    ResponseTime,
    MemoryUsage,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::UpdateFrequency,
        Metric::UpdateTime,
        Metric::ErrorRate,
        Metric::ResponseTime,
        Metric::MemoryUsage,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Metric::UpdateFrequency => "update_frequency",
            Metric::UpdateTime => "update_time",
            Metric::ErrorRate => "error_rate",
            Metric::ResponseTime => "response_time",
            Metric::MemoryUsage => "memory_usage",
        }
    }

    /// Human-readable name used in alerts and the dashboard
    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::UpdateFrequency => "Update frequency",
            Metric::UpdateTime => "Average update time",
            Metric::ErrorRate => "Error rate",
            Metric::ResponseTime => "Response time",
            Metric::MemoryUsage => "Memory usage",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::UpdateFrequency => "/min",
            Metric::UpdateTime | Metric::ResponseTime => "ms",
            Metric::ErrorRate => "%",
            Metric::MemoryUsage => "MB",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Warning and error limits for one metric
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Threshold {
    pub warning: f64,
    pub error: f64,
}

impl Threshold {
    pub fn new(warning: f64, error: f64) -> Self {
        Self { warning, error }
    }
}

/// Per-metric threshold table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Thresholds(BTreeMap<Metric, Threshold>);

impl Default for Thresholds {
    fn default() -> Self {
        let mut table = BTreeMap::new();
        table.insert(Metric::UpdateFrequency, Threshold::new(60.0, 120.0));
        table.insert(Metric::UpdateTime, Threshold::new(100.0, 200.0));
        table.insert(Metric::ErrorRate, Threshold::new(5.0, 10.0));
        table.insert(Metric::ResponseTime, Threshold::new(100.0, 300.0));
        table.insert(Metric::MemoryUsage, Threshold::new(100.0, 200.0));
        Self(table)
    }
}

impl Thresholds {
    /// Table with no thresholds at all
    pub fn none() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, metric: Metric, threshold: Threshold) -> Self {
        self.0.insert(metric, threshold);
        self
    }

    pub fn get(&self, metric: Metric) -> Option<Threshold> {
        self.0.get(&metric).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, Threshold)> + '_ {
        self.0.iter().map(|(metric, threshold)| (*metric, *threshold))
    }
}
