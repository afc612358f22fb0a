use crate::aggregator::Thresholds;
use crate::analytics::DEFAULT_MAX_SAMPLES;
use crate::classifier::TrendConfig;
use crate::error::ConfigError;
use crate::events::{LogCategory, LogLevel};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration, loaded from TOML
///
/// Every section falls back to its defaults when omitted, so an empty file is
/// a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub aggregator: AggregatorConfig,
    pub analytics: AnalyticsConfig,
}

/// Admission, retention and sink settings of the log store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Master switch; when off every log call is a no-op
    pub enabled: bool,
    /// Minimum level admitted into the store
    pub level: LogLevel,
    /// Categories admitted into the store
    pub categories: Vec<LogCategory>,
    /// Maximum number of stored entries
    pub max_entries: usize,
    /// Entries older than this are removed by the retention sweep
    pub retention_seconds: u64,
    /// Period of the retention sweep
    pub cleanup_interval_seconds: u64,
    pub enable_performance_tracking: bool,
    /// Keep captured error stacks on stored entries
    pub enable_error_stack_traces: bool,
    /// Mirror admitted entries to the `log` facade
    pub enable_console_output: bool,
    /// Forward admitted entries above debug to the analytics sink
    pub enable_analytics_reporting: bool,
    pub rate_limiting: RateLimitConfig,
    pub sanitization: SanitizationConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
            categories: LogCategory::ALL.to_vec(),
            max_entries: 1000,
            retention_seconds: 7 * 24 * 60 * 60,
            cleanup_interval_seconds: 60,
            enable_performance_tracking: true,
            enable_error_stack_traces: true,
            enable_console_output: false,
            enable_analytics_reporting: false,
            rate_limiting: RateLimitConfig::default(),
            sanitization: SanitizationConfig::default(),
        }
    }
}

impl LoggingConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retention_seconds as i64)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }
}

/// Per-(level, category) admission quota
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_per_minute: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_per_minute: 100,
        }
    }
}

/// Redaction of sensitive payload keys
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SanitizationConfig {
    pub enabled: bool,
    /// Payload keys whose values are replaced, matched exactly
    pub sensitive_fields: Vec<String>,
}

impl Default for SanitizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sensitive_fields: ["password", "token", "apiKey", "secret", "creditCard"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Sampling cadence, window and classification tables of the metrics engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Period between snapshots, in milliseconds
    pub update_interval_ms: u64,
    /// Length of the aggregation window, in seconds
    pub window_seconds: u64,
    pub thresholds: Thresholds,
    /// Per-metric stability thresholds for trend detection, in percent
    pub trend: TrendConfig,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 2000,
            window_seconds: 5 * 60,
            thresholds: Thresholds::default(),
            trend: TrendConfig::default(),
        }
    }
}

impl AggregatorConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.window_seconds as i64)
    }
}

/// Periodic summary reporting to the analytics collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// HTTP endpoint receiving events; events go to the `log` facade when unset
    pub endpoint: Option<String>,
    /// Period of the summary report, in seconds
    pub report_interval_seconds: u64,
    /// Samples required before a summary is emitted
    pub min_samples: usize,
    /// Upper bound on samples buffered between summaries
    pub max_samples: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            report_interval_seconds: 30,
            min_samples: 5,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

impl AnalyticsConfig {
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_seconds)
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read,
    /// `ConfigError::TomlError` for malformed TOML, or
    /// `ConfigError::ValidationError` for values out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all values are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.max_entries == 0 {
            return Err(ConfigError::ValidationError(
                "logging.max_entries must be greater than 0".to_string(),
            ));
        }
        if self.logging.cleanup_interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "logging.cleanup_interval_seconds must be greater than 0".to_string(),
            ));
        }
        if self.logging.rate_limiting.enabled && self.logging.rate_limiting.max_per_minute == 0 {
            return Err(ConfigError::ValidationError(
                "logging.rate_limiting.max_per_minute must be greater than 0".to_string(),
            ));
        }
        if self.aggregator.update_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "aggregator.update_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.aggregator.window_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "aggregator.window_seconds must be greater than 0".to_string(),
            ));
        }
        for (metric, threshold) in self.aggregator.thresholds.iter() {
            if threshold.warning > threshold.error {
                return Err(ConfigError::ValidationError(format!(
                    "aggregator.thresholds.{}: warning ({}) exceeds error ({})",
                    metric, threshold.warning, threshold.error
                )));
            }
        }
        for (metric, percent) in self.aggregator.trend.iter() {
            if percent < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "aggregator.trend.{} must not be negative",
                    metric
                )));
            }
        }
        if self.analytics.report_interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "analytics.report_interval_seconds must be greater than 0".to_string(),
            ));
        }
        if self.analytics.max_samples < self.analytics.min_samples.max(1) {
            return Err(ConfigError::ValidationError(format!(
                "analytics.max_samples ({}) must be at least analytics.min_samples ({})",
                self.analytics.max_samples, self.analytics.min_samples
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{Metric, Threshold};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.logging.max_entries, 1000);
        assert_eq!(config.aggregator.update_interval(), Duration::from_millis(2000));
        assert_eq!(config.aggregator.window(), chrono::Duration::minutes(5));
        assert_eq!(config.logging.retention(), chrono::Duration::days(7));
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml_str(
            r#"
            [logging]
            level = "warn"
            categories = ["hierarchy", "performance"]
            max_entries = 5

            [logging.rate_limiting]
            max_per_minute = 10

            [aggregator.thresholds.update_time]
            warning = 150
            error = 200
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(
            config.logging.categories,
            vec![LogCategory::Hierarchy, LogCategory::Performance]
        );
        assert_eq!(config.logging.max_entries, 5);
        assert!(config.logging.rate_limiting.enabled);
        assert_eq!(config.logging.rate_limiting.max_per_minute, 10);
        assert_eq!(
            config.aggregator.thresholds.get(Metric::UpdateTime),
            Some(Threshold::new(150.0, 200.0))
        );
    }

    #[test]
    fn test_validation_rejects_inverted_threshold() {
        let result = Config::from_toml_str(
            r#"
            [aggregator.thresholds.error_rate]
            warning = 20
            error = 10
            "#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let mut config = Config::default();
        config.logging.max_entries = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validation_rejects_sample_cap_below_minimum() {
        let result = Config::from_toml_str(
            r#"
            [analytics]
            min_samples = 10
            max_samples = 5
            "#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml_str("[logging\nlevel = ");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[aggregator]\nupdate_interval_ms = 500").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.aggregator.update_interval_ms, 500);
    }

    #[test]
    fn test_directory_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_file(dir.path());
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = Config::from_file(Path::new("/nonexistent/lookout.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
