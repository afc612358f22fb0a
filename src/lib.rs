//! Observability core for a visual UI builder
//!
//! Application code records structured entries through a shared [`Logger`].
//! A [`MetricsEngine`] periodically turns the recent entries into a
//! performance snapshot, trends, component health and alerts, and publishes
//! them for any dashboard to render.

/// Error types for the observability core
pub mod error;

/// Core entry types: levels, categories, context and log entries
pub mod events;

/// Wall-clock and monotonic time sources
pub mod clock;

/// Small descriptive statistics helpers
pub mod stats;

/// Configuration management
pub mod config;

/// Bounded log store with rate limiting, sanitization and export
pub mod store;

/// Shared logging handle
pub mod logger;

/// Keyed timers and measured units of work
pub mod timing;

/// Snapshot computation over the aggregation window
pub mod aggregator;

/// Trend and health classification
pub mod classifier;

/// Threshold alerts
pub mod alerts;

/// Analytics sinks and periodic performance summaries
pub mod analytics;

/// Cancellable periodic tasks
pub mod scheduler;

/// Sampling engine, memory probe and monitoring runtime
pub mod monitoring;

/// Text dashboard view
pub mod dashboard;

/// Retrying supervisor for fallible operations
pub mod supervisor;

// Re-export commonly used types
pub use error::{AnalyticsError, ConfigError, ExportError, TimingError};
pub use events::{CapturedError, LogCategory, LogContext, LogEntry, LogLevel};
pub use logger::Logger;
pub use monitoring::{DashboardState, MetricsEngine, MonitorRuntime};
