use crate::aggregator::{Metric, PerformanceSnapshot, Thresholds};
use crate::events::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a threshold alert
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Error,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Warning => f.write_str("warning"),
            AlertLevel::Error => f.write_str("error"),
        }
    }
}

/// A metric above one of its thresholds in the current snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: String,
    pub level: AlertLevel,
    pub message: String,
    pub metric: Metric,
    pub value: f64,
    /// The threshold that was exceeded
    pub threshold: f64,
    pub timestamp: Timestamp,
}

/// Derive the complete alert set for a snapshot
///
/// At most one alert is produced per metric: an error alert when the value
/// exceeds the error threshold, otherwise a warning alert when it exceeds the
/// warning threshold. The result replaces the previous cycle's alerts; it is
/// never a delta.
///
/// # Arguments
///
/// * `snapshot` - Statistics of the current cycle
/// * `thresholds` - Per-metric limits; metrics without an entry never alert
///
/// # Returns
///
/// Alerts ordered by metric
pub fn derive_alerts(snapshot: &PerformanceSnapshot, thresholds: &Thresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for (metric, threshold) in thresholds.iter() {
        let Some(value) = snapshot.value(metric) else {
            continue;
        };

        let (level, limit) = if value > threshold.error {
            (AlertLevel::Error, threshold.error)
        } else if value > threshold.warning {
            (AlertLevel::Warning, threshold.warning)
        } else {
            continue;
        };

        alerts.push(Alert {
            id: format!(
                "{}-{}-{}",
                metric,
                level,
                snapshot.timestamp.timestamp_millis()
            ),
            level,
            message: format!(
                "{} is {:.1}{} (threshold: {:.1}{})",
                metric.display_name(),
                value,
                metric.unit(),
                limit,
                metric.unit()
            ),
            metric,
            value,
            threshold: limit,
            timestamp: snapshot.timestamp,
        });
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Threshold;
    use chrono::{TimeZone, Utc};

    fn snapshot() -> PerformanceSnapshot {
        PerformanceSnapshot::empty(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_error_supersedes_warning() {
        let mut snapshot = snapshot();
        snapshot.avg_update_time = 250.0;
        let thresholds = Thresholds::none().with(Metric::UpdateTime, Threshold::new(150.0, 200.0));

        let alerts = derive_alerts(&snapshot, &thresholds);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Error);
        assert_eq!(alerts[0].metric, Metric::UpdateTime);
        assert_eq!(alerts[0].threshold, 200.0);
        assert_eq!(
            alerts[0].message,
            "Average update time is 250.0ms (threshold: 200.0ms)"
        );
    }

    #[test]
    fn test_warning_alert() {
        let mut snapshot = snapshot();
        snapshot.error_rate = 7.5;

        let alerts = derive_alerts(&snapshot, &Thresholds::default());

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
        assert_eq!(alerts[0].threshold, 5.0);
        assert_eq!(
            alerts[0].id,
            format!("error_rate-warning-{}", snapshot.timestamp.timestamp_millis())
        );
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut snapshot = snapshot();
        snapshot.avg_update_time = 100.0;
        snapshot.response_time = 300.0;

        let alerts = derive_alerts(&snapshot, &Thresholds::default());

        // 100 sits on the warning limit; 300 sits on the error limit and only warns
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].metric, Metric::ResponseTime);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
    }

    #[test]
    fn test_missing_memory_never_alerts() {
        let snapshot = snapshot();
        let thresholds = Thresholds::none().with(Metric::MemoryUsage, Threshold::new(0.0, 0.0));

        assert!(derive_alerts(&snapshot, &thresholds).is_empty());
    }

    #[test]
    fn test_quiet_snapshot_has_no_alerts() {
        assert!(derive_alerts(&snapshot(), &Thresholds::default()).is_empty());
    }
}

// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::aggregator::Threshold;
    use chrono::Utc;
    use quickcheck_macros::quickcheck;

    // Never more than one alert per metric, and each alert's value exceeds its threshold
    #[quickcheck]
    fn prop_one_alert_per_metric(
        update_time: u16,
        error_rate: u8,
        warning: u8,
        spread: u8,
    ) -> bool {
        let mut snapshot = PerformanceSnapshot::empty(Utc::now());
        snapshot.avg_update_time = update_time as f64;
        snapshot.error_rate = error_rate as f64;

        let threshold = Threshold::new(warning as f64, warning as f64 + spread as f64);
        let thresholds = Thresholds::none()
            .with(Metric::UpdateTime, threshold)
            .with(Metric::ErrorRate, threshold);

        let alerts = derive_alerts(&snapshot, &thresholds);

        let mut metrics: Vec<Metric> = alerts.iter().map(|alert| alert.metric).collect();
        metrics.dedup();

        metrics.len() == alerts.len()
            && alerts.iter().all(|alert| alert.value > alert.threshold)
    }
}
