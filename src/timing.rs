//! Named timers on top of the logger's timing primitives
//!
//! [`TimerRegistry`] keys every timer by `name:key` so overlapping
//! measurements of the same operation stay apart. [`PerformanceMonitor`] is the
//! strict variant: it hands out ids and rejects ids it does not know.

use crate::error::TimingError;
use crate::events::{DataMap, LogCategory, LogLevel};
use crate::logger::Logger;
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Key used when the caller does not supply one
pub const DEFAULT_KEY: &str = "default";

/// Output of a measured unit of work
#[derive(Debug, Clone, PartialEq)]
pub struct Measured<T> {
    pub result: T,
    pub duration_ms: f64,
}

/// Composite timer key for an operation name and an optional caller key
pub fn timer_key(name: &str, key: Option<&str>) -> String {
    format!("{}:{}", name, key.unwrap_or(DEFAULT_KEY))
}

/// Ends its timer when dropped, unless already finished
struct TimingGuard {
    logger: Logger,
    name: String,
    key: String,
    category: LogCategory,
    started_ms: f64,
    finished: bool,
}

impl TimingGuard {
    fn start(logger: &Logger, name: &str, key: Option<&str>, category: LogCategory) -> Self {
        let key = timer_key(name, key);
        logger.start_timing(&key);
        Self {
            logger: logger.clone(),
            name: name.to_string(),
            key,
            category,
            started_ms: logger.clock().monotonic_ms(),
            finished: false,
        }
    }

    fn finish(&mut self) -> f64 {
        self.finished = true;
        let elapsed = (self.logger.clock().monotonic_ms() - self.started_ms).max(0.0);
        self.logger
            .end_timing(&self.key, self.category, self.name.as_str(), None)
            .unwrap_or(elapsed)
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.finish();
        }
    }
}

/// Keyed timers that log their duration when they end
#[derive(Clone)]
pub struct TimerRegistry {
    logger: Logger,
}

impl TimerRegistry {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Start the timer `name:key`
    pub fn start(&self, name: &str, key: Option<&str>) {
        self.logger.start_timing(&timer_key(name, key));
    }

    /// End the timer `name:key` and log its duration under `category`
    ///
    /// # Returns
    ///
    /// The elapsed milliseconds, or `None` if the timer was not running
    pub fn end(&self, name: &str, key: Option<&str>, category: LogCategory) -> Option<f64> {
        self.logger.end_timing(&timer_key(name, key), category, name, None)
    }

    /// Time a unit of work
    ///
    /// The timer is ended on every exit path, including a panic unwinding
    /// through `f`. A failure from `f` is returned unchanged after its
    /// duration has been logged.
    ///
    /// # Examples
    ///
    /// ```
    /// use lookout::config::Config;
    /// use lookout::logger::Logger;
    /// use lookout::timing::TimerRegistry;
    ///
    /// let timers = TimerRegistry::new(Logger::new(&Config::default()));
    /// let measured = timers
    ///     .measure("render canvas", None, || Ok::<_, std::io::Error>(42))
    ///     .unwrap();
    /// assert_eq!(measured.result, 42);
    /// ```
    pub fn measure<T, E, F>(&self, name: &str, key: Option<&str>, f: F) -> Result<Measured<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut guard = TimingGuard::start(&self.logger, name, key, LogCategory::Performance);
        let outcome = f();
        let duration_ms = guard.finish();
        outcome.map(|result| Measured {
            result,
            duration_ms,
        })
    }

    /// Time a future, with the same guarantees as [`TimerRegistry::measure`]
    ///
    /// Dropping the returned future before it completes also ends the timer.
    pub async fn measure_async<T, E, Fut>(
        &self,
        name: &str,
        key: Option<&str>,
        fut: Fut,
    ) -> Result<Measured<T>, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let mut guard = TimingGuard::start(&self.logger, name, key, LogCategory::Performance);
        let outcome = fut.await;
        let duration_ms = guard.finish();
        outcome.map(|result| Measured {
            result,
            duration_ms,
        })
    }
}

/// Identifier of one running strict measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeasurementId(u64);

impl MeasurementId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Measurement API that treats an unknown id as a usage error
pub struct PerformanceMonitor {
    logger: Logger,
    next_id: AtomicU64,
    /// Operation name and monotonic start of each running measurement
    active: Mutex<HashMap<u64, (String, f64)>>,
}

impl PerformanceMonitor {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            next_id: AtomicU64::new(1),
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn start_measurement(&self, name: &str) -> MeasurementId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let started = self.logger.clock().monotonic_ms();
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, (name.to_string(), started));
        MeasurementId(id)
    }

    /// End a measurement and log its duration
    ///
    /// # Errors
    ///
    /// Returns `TimingError::UnknownMeasurement` if the id was never issued or
    /// has already been ended.
    pub fn end_measurement(&self, id: MeasurementId) -> Result<f64, TimingError> {
        let (name, started) = self
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id.0)
            .ok_or(TimingError::UnknownMeasurement(id.0))?;

        let duration = (self.logger.clock().monotonic_ms() - started).max(0.0);

        let mut data = DataMap::new();
        data.insert("duration".to_string(), json!(duration));
        data.insert("measurementId".to_string(), json!(id.0));
        self.logger.log(
            LogLevel::Info,
            LogCategory::Performance,
            name,
            None,
            Some(data),
            None,
        );

        Ok(duration)
    }

    pub fn active_measurements(&self) -> usize {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
