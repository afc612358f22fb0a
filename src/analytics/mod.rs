/// Analytics sink trait and implementations
pub mod sink;

/// Periodic hierarchy performance summaries
pub mod reporter;

pub use reporter::{
    HierarchySummary, PerformanceReporter, UpdateSample, DEFAULT_MAX_SAMPLES, SUMMARY_EVENT,
};
#[cfg(test)]
pub use sink::MockAnalyticsSink;
pub use sink::{AnalyticsEvent, AnalyticsSink, HttpAnalyticsSink, LogAnalyticsSink};
