//! Shared logging handle
//!
//! A [`Logger`] is built once at startup and cloned into every collaborator.
//! All clones share one [`LogStore`], one analytics sink and one clock, so the
//! store stays the single owner of buffered entries while callers on any
//! thread can log without coordinating.

use crate::aggregator::Metric;
use crate::analytics::{AnalyticsEvent, AnalyticsSink, PerformanceReporter};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::ExportError;
use crate::events::{
    CapturedError, DataMap, LogCategory, LogContext, LogEntry, LogLevel, Timestamp, Viewport,
};
use crate::store::{export_entries, CleanupReport, EntryFilter, ExportFormat, LogStats, LogStore};
use log::{debug, warn};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle onto the shared log store
#[derive(Clone)]
pub struct Logger {
    store: Arc<Mutex<LogStore>>,
    reporter: Arc<Mutex<PerformanceReporter>>,
    sink: Option<Arc<dyn AnalyticsSink>>,
    clock: Arc<dyn Clock>,
    console_output: bool,
    analytics_reporting: bool,
}

impl Logger {
    /// Create a logger with the system clock and no analytics sink
    pub fn new(config: &Config) -> Self {
        let reporter = PerformanceReporter::new(
            config.analytics.min_samples,
            config.aggregator.trend.stable_threshold(Metric::UpdateTime),
        )
        .with_max_samples(config.analytics.max_samples);

        Self {
            store: Arc::new(Mutex::new(LogStore::new(&config.logging))),
            reporter: Arc::new(Mutex::new(reporter)),
            sink: None,
            clock: Arc::new(SystemClock::new()),
            console_output: config.logging.enable_console_output,
            analytics_reporting: config.logging.enable_analytics_reporting,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Record one entry
    ///
    /// The entry is stamped with the logger's clock and goes through the
    /// store's admission rules. Rejected entries vanish silently. Admitted
    /// entries are mirrored to the `log` facade and forwarded to the analytics
    /// sink when those outputs are enabled.
    pub fn log(
        &self,
        level: LogLevel,
        category: LogCategory,
        message: impl Into<String>,
        context: Option<LogContext>,
        data: Option<DataMap>,
        error: Option<CapturedError>,
    ) {
        self.record(level, category, message.into(), context, data, error);
    }

    /// Append and fan out one entry; `true` if the store admitted it
    fn record(
        &self,
        level: LogLevel,
        category: LogCategory,
        message: String,
        context: Option<LogContext>,
        data: Option<DataMap>,
        error: Option<CapturedError>,
    ) -> bool {
        let mut entry = LogEntry::new(level, category, message, self.clock.now());
        entry.context = context;
        entry.data = data;
        entry.error = error;

        let forward = self.analytics_reporting && level >= LogLevel::Info && self.sink.is_some();

        let stored = {
            let mut store = self.lock_store();
            match store.append(entry) {
                Some(stored) if self.console_output || forward => stored.clone(),
                Some(_) => return true,
                None => return false,
            }
        };

        if self.console_output {
            let target = format!("lookout::{}", stored.category);
            log::log!(target: target.as_str(), stored.level.as_log_level(), "{}", stored.message);
        }

        if forward {
            if let Some(sink) = &self.sink {
                if let Err(e) = sink.track(AnalyticsEvent::from_entry(&stored)) {
                    warn!("Failed to forward log entry to analytics: {}", e);
                }
            }
        }
        true
    }

    pub fn trace(&self, category: LogCategory, message: impl Into<String>, data: Option<DataMap>) {
        self.log(LogLevel::Trace, category, message, None, data, None);
    }

    pub fn debug(&self, category: LogCategory, message: impl Into<String>, data: Option<DataMap>) {
        self.log(LogLevel::Debug, category, message, None, data, None);
    }

    pub fn info(&self, category: LogCategory, message: impl Into<String>, data: Option<DataMap>) {
        self.log(LogLevel::Info, category, message, None, data, None);
    }

    pub fn warn(&self, category: LogCategory, message: impl Into<String>, data: Option<DataMap>) {
        self.log(LogLevel::Warn, category, message, None, data, None);
    }

    pub fn error(
        &self,
        category: LogCategory,
        message: impl Into<String>,
        error: Option<CapturedError>,
        data: Option<DataMap>,
    ) {
        self.log(LogLevel::Error, category, message, None, data, error);
    }

    /// Record a change to the component hierarchy
    ///
    /// When the entry is admitted and analytics reporting has a sink, a
    /// measured duration is also collected for the periodic performance
    /// summary.
    ///
    /// # Arguments
    ///
    /// * `update_type` - Kind of update, e.g. "move" or "reparent"
    /// * `component_id` - Component that changed
    /// * `hierarchy_path` - Ancestors of the component, root first
    /// * `duration_ms` - How long the update took, if measured
    pub fn log_hierarchy_update(
        &self,
        update_type: &str,
        component_id: &str,
        hierarchy_path: Vec<String>,
        duration_ms: Option<f64>,
    ) {
        let mut data = DataMap::new();
        data.insert("updateType".to_string(), Value::from(update_type));
        if let Some(duration) = duration_ms {
            data.insert("duration".to_string(), json!(duration));
        }

        let admitted = self.record(
            LogLevel::Info,
            LogCategory::Hierarchy,
            format!("Hierarchy update: {}", update_type),
            Some(LogContext::component(component_id).with_path(hierarchy_path)),
            Some(data),
            None,
        );

        if let Some(duration) = duration_ms {
            if admitted && self.analytics_reporting && self.sink.is_some() {
                self.lock_reporter().record(update_type, duration);
            }
        }
    }

    /// Hierarchy samples waiting for the next performance summary
    pub fn pending_performance_samples(&self) -> usize {
        self.lock_reporter().sample_count()
    }

    pub fn log_user_interaction(
        &self,
        action: &str,
        component_id: Option<&str>,
        data: Option<DataMap>,
    ) {
        let mut data = data.unwrap_or_default();
        data.insert("action".to_string(), Value::from(action));

        self.log(
            LogLevel::Info,
            LogCategory::UserInteraction,
            format!("User interaction: {}", action),
            component_id.map(LogContext::component),
            Some(data),
            None,
        );
    }

    pub fn log_state_change(&self, action: &str, previous: Value, next: Value) {
        let mut data = DataMap::new();
        data.insert("action".to_string(), Value::from(action));
        data.insert("previousState".to_string(), previous);
        data.insert("newState".to_string(), next);

        self.log(
            LogLevel::Debug,
            LogCategory::StateManagement,
            format!("State change: {}", action),
            None,
            Some(data),
            None,
        );
    }

    /// Record a rejected edit, at warn level
    pub fn log_validation_error(&self, component_id: &str, message: &str, data: Option<DataMap>) {
        self.log(
            LogLevel::Warn,
            LogCategory::Validation,
            format!("Validation error: {}", message),
            Some(LogContext::component(component_id)),
            data,
            None,
        );
    }

    pub fn log_accessibility_event(&self, component_id: &str, issue: &str, data: Option<DataMap>) {
        self.log(
            LogLevel::Warn,
            LogCategory::Accessibility,
            format!("Accessibility issue: {}", issue),
            Some(LogContext::component(component_id)),
            data,
            None,
        );
    }

    pub fn log_responsive_change(&self, breakpoint: &str, viewport: Viewport) {
        let context = LogContext {
            viewport: Some(viewport),
            ..LogContext::default()
        };
        let mut data = DataMap::new();
        data.insert("breakpoint".to_string(), Value::from(breakpoint));

        self.log(
            LogLevel::Info,
            LogCategory::Responsive,
            format!("Breakpoint changed: {}", breakpoint),
            Some(context),
            Some(data),
            None,
        );
    }

    /// Start a timing under `key`, replacing any running timing of that key
    pub fn start_timing(&self, key: &str) {
        let now = self.clock.monotonic_ms();
        self.lock_store().start_timing(key, now);
    }

    /// Stop a timing and log its duration at info level
    ///
    /// The elapsed milliseconds are stored under the `duration` payload key.
    /// Ending a key that was never started does nothing.
    ///
    /// # Returns
    ///
    /// The measured duration, if a timing was running
    pub fn end_timing(
        &self,
        key: &str,
        category: LogCategory,
        message: impl Into<String>,
        context: Option<LogContext>,
    ) -> Option<f64> {
        let now = self.clock.monotonic_ms();
        let duration = self.lock_store().finish_timing(key, now)?;

        let mut data = DataMap::new();
        data.insert("duration".to_string(), json!(duration));
        self.log(LogLevel::Info, category, message, context, Some(data), None);

        Some(duration)
    }

    pub fn running_timings(&self) -> usize {
        self.lock_store().running_timings()
    }

    pub fn entries(&self, filter: &EntryFilter) -> Vec<LogEntry> {
        self.lock_store().entries(filter)
    }

    /// Entries strictly newer than `cutoff`, read under a single lock
    pub fn entries_after(&self, cutoff: Timestamp) -> Vec<LogEntry> {
        self.lock_store().entries_after(cutoff)
    }

    pub fn stats(&self) -> LogStats {
        self.lock_store().stats()
    }

    /// Run the retention sweep against the logger's clock
    pub fn cleanup(&self) -> CleanupReport {
        let now = self.clock.now();
        let report = self.lock_store().cleanup(now);
        if report.entries_removed > 0 || report.windows_removed > 0 {
            debug!(
                "Retention sweep removed {} entries and {} rate windows",
                report.entries_removed, report.windows_removed
            );
        }
        report
    }

    pub fn clear(&self) {
        self.lock_store().clear();
    }

    /// Serialize every stored entry
    pub fn export_logs(&self, format: ExportFormat) -> Result<String, ExportError> {
        let entries = self.entries(&EntryFilter::default());
        export_entries(&entries, format)
    }

    /// Write the export of every stored entry to `path`
    ///
    /// # Errors
    ///
    /// Returns an `ExportError` if serialization or the write fails.
    pub fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let contents = self.export_logs(format)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Send the accumulated hierarchy performance summary, if one is due
    ///
    /// # Returns
    ///
    /// `true` if a summary reached the sink
    pub fn report_performance(&self) -> bool {
        let Some(sink) = &self.sink else {
            return false;
        };
        let now = self.clock.now();
        self.lock_reporter().report(sink.as_ref(), now)
    }

    fn lock_store(&self) -> MutexGuard<'_, LogStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_reporter(&self) -> MutexGuard<'_, PerformanceReporter> {
        self.reporter.lock().unwrap_or_else(|e| e.into_inner())
    }
}
