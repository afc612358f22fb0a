/// Snapshot computation over the aggregation window
pub mod metrics_aggregator;

/// Snapshot, metric and threshold types
pub mod snapshot;

pub use metrics_aggregator::compute_snapshot;
pub use snapshot::{Metric, PerformanceSnapshot, Threshold, Thresholds};
