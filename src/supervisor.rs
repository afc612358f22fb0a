//! Retrying wrapper around fallible async operations
//!
//! Failures are logged through the [`Logger`] and retried with exponential
//! backoff until the retry budget is spent. A spent budget stays spent until
//! the operation succeeds or [`Supervisor::reset`] is called.

use crate::events::{CapturedError, DataMap, LogCategory};
use crate::logger::Logger;
use log::{debug, warn};
use serde_json::json;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

pub struct Supervisor {
    name: String,
    logger: Logger,
    max_retries: u32,
    base_delay: Duration,
    /// Retries consumed since the last success or reset
    retries: u32,
}

impl Supervisor {
    pub fn new(name: impl Into<String>, logger: Logger) -> Self {
        Self::with_policy(name, logger, DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }

    /// Create a supervisor with an explicit retry policy
    ///
    /// # Arguments
    ///
    /// * `max_retries` - Automatic retries after the first failure
    /// * `base_delay` - Delay before the first retry; doubles on each retry
    pub fn with_policy(
        name: impl Into<String>,
        logger: Logger,
        max_retries: u32,
        base_delay: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            logger,
            max_retries,
            base_delay,
            retries: 0,
        }
    }

    /// Backoff before retry number `retry` (zero-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << retry.min(16))
    }

    pub fn retries_used(&self) -> u32 {
        self.retries
    }

    pub fn is_exhausted(&self) -> bool {
        self.retries >= self.max_retries
    }

    /// Restore the full retry budget
    pub fn reset(&mut self) {
        if self.retries > 0 {
            debug!("Supervisor '{}' reset after {} retries", self.name, self.retries);
        }
        self.retries = 0;
    }

    /// Run `op`, retrying failures while the budget lasts
    ///
    /// Every failure is logged as an error entry with the captured error. The
    /// caller's error is returned unchanged once no retry is left.
    pub async fn run<T, E, F, Fut>(&mut self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error,
    {
        loop {
            match op().await {
                Ok(value) => {
                    self.retries = 0;
                    return Ok(value);
                }
                Err(e) => {
                    let exhausted = self.is_exhausted();
                    self.log_failure(&e, exhausted);

                    if exhausted {
                        warn!("Supervisor '{}' giving up: {}", self.name, e);
                        return Err(e);
                    }

                    let delay = self.backoff(self.retries);
                    self.retries += 1;
                    debug!(
                        "Supervisor '{}' retrying in {:?} ({}/{})",
                        self.name, delay, self.retries, self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn log_failure<E: std::error::Error>(&self, error: &E, final_failure: bool) {
        let mut data = DataMap::new();
        data.insert("supervisor".to_string(), json!(self.name));
        data.insert("retries".to_string(), json!(self.retries));
        data.insert("final".to_string(), json!(final_failure));

        self.logger.error(
            LogCategory::System,
            format!("{} failed: {}", self.name, error),
            Some(CapturedError::from_error(error)),
            Some(data),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::events::LogLevel;
    use crate::store::EntryFilter;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn flaky(
        failures: u32,
        calls: Arc<AtomicU32>,
    ) -> impl FnMut() -> std::future::Ready<Result<&'static str, io::Error>> {
        move || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if call < failures {
                Err(io::Error::new(io::ErrorKind::Other, "preview crashed"))
            } else {
                Ok("rendered")
            })
        }
    }

    fn error_entries(logger: &Logger) -> usize {
        logger
            .entries(&EntryFilter::default().level(LogLevel::Error))
            .len()
    }

    #[test]
    fn test_backoff_doubles() {
        let supervisor = Supervisor::new("preview", Logger::new(&Config::default()));
        assert_eq!(supervisor.backoff(0), Duration::from_secs(1));
        assert_eq!(supervisor.backoff(1), Duration::from_secs(2));
        assert_eq!(supervisor.backoff(3), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_within_budget() {
        let logger = Logger::new(&Config::default());
        let mut supervisor = Supervisor::new("preview", logger.clone());
        let calls = Arc::new(AtomicU32::new(0));

        let started = tokio::time::Instant::now();
        let outcome = supervisor.run(flaky(2, Arc::clone(&calls))).await;

        assert_eq!(outcome.unwrap(), "rendered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(error_entries(&logger), 2);
        assert_eq!(supervisor.retries_used(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_with_last_error() {
        let logger = Logger::new(&Config::default());
        let mut supervisor =
            Supervisor::with_policy("preview", logger.clone(), 2, Duration::from_millis(10));
        let calls = Arc::new(AtomicU32::new(0));

        let outcome = supervisor.run(flaky(u32::MAX, Arc::clone(&calls))).await;

        assert_eq!(outcome.unwrap_err().to_string(), "preview crashed");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(supervisor.is_exhausted());

        let entries = logger.entries(&EntryFilter::default().level(LogLevel::Error));
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].data.as_ref().unwrap()["final"], json!(true));
        assert_eq!(entries[2].error.as_ref().unwrap().message, "preview crashed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_supervisor_needs_reset() {
        let logger = Logger::new(&Config::default());
        let mut supervisor =
            Supervisor::with_policy("preview", logger, 1, Duration::from_millis(10));
        let calls = Arc::new(AtomicU32::new(0));

        let _ = supervisor.run(flaky(u32::MAX, Arc::clone(&calls))).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // No automatic retries left
        let _ = supervisor.run(flaky(u32::MAX, Arc::clone(&calls))).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        supervisor.reset();
        assert!(!supervisor.is_exhausted());
        let _ = supervisor.run(flaky(u32::MAX, Arc::clone(&calls))).await;
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }
}
