//! Health classification of monitored components
//!
//! Status is a pure function of the latest snapshot and the threshold table.
//! Nothing is carried between cycles, so one breaching sample flips a component
//! immediately and the next clean sample flips it back.

use crate::aggregator::{Metric, PerformanceSnapshot, Thresholds};
use crate::events::Timestamp;
use serde::{Deserialize, Serialize};

/// Health of one component, ordered from best to worst
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Failed,
}

/// Latest derived status of a monitored component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthIndicator {
    pub component: String,
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_update: Timestamp,
}

/// A monitored component and the metrics that decide its status
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSpec {
    pub name: String,
    pub metrics: Vec<Metric>,
    /// Skip the component when none of its metrics has a value
    pub optional: bool,
}

impl ComponentSpec {
    pub fn new(name: impl Into<String>, metrics: Vec<Metric>) -> Self {
        Self {
            name: name.into(),
            metrics,
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// The builder's standard component set
    pub fn defaults() -> Vec<ComponentSpec> {
        vec![
            ComponentSpec::new(
                "Hierarchy System",
                vec![Metric::UpdateFrequency, Metric::ErrorRate],
            ),
            ComponentSpec::new("Update Engine", vec![Metric::UpdateTime]),
            ComponentSpec::new("Property Indicators", vec![Metric::ResponseTime]),
            ComponentSpec::new("Memory Usage", vec![Metric::MemoryUsage]).optional(),
        ]
    }
}

/// Classify every component against the threshold table
pub fn classify_health(
    snapshot: &PerformanceSnapshot,
    thresholds: &Thresholds,
    components: &[ComponentSpec],
    now: Timestamp,
) -> Vec<HealthIndicator> {
    components
        .iter()
        .filter(|component| {
            !component.optional
                || component
                    .metrics
                    .iter()
                    .any(|metric| snapshot.value(*metric).is_some())
        })
        .map(|component| classify_component(snapshot, thresholds, component, now))
        .collect()
}

fn classify_component(
    snapshot: &PerformanceSnapshot,
    thresholds: &Thresholds,
    component: &ComponentSpec,
    now: Timestamp,
) -> HealthIndicator {
    let mut status = HealthStatus::Healthy;
    let mut reasons = Vec::new();

    for &metric in &component.metrics {
        let (Some(value), Some(threshold)) = (snapshot.value(metric), thresholds.get(metric))
        else {
            continue;
        };

        let metric_status = if value > threshold.error {
            HealthStatus::Failed
        } else if value > threshold.warning {
            HealthStatus::Degraded
        } else {
            continue;
        };

        reasons.push(format!(
            "{} {:.1}{} exceeds {} threshold",
            metric.display_name(),
            value,
            metric.unit(),
            if metric_status == HealthStatus::Failed {
                "error"
            } else {
                "warning"
            }
        ));
        status = status.max(metric_status);
    }

    HealthIndicator {
        component: component.name.clone(),
        status,
        message: if reasons.is_empty() {
            None
        } else {
            Some(reasons.join("; "))
        },
        last_update: now,
    }
}

/// Worst status among all components
pub fn overall_health(indicators: &[HealthIndicator]) -> HealthStatus {
    indicators
        .iter()
        .map(|indicator| indicator.status)
        .max()
        .unwrap_or(HealthStatus::Healthy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Threshold;
    use chrono::Utc;

    fn snapshot() -> PerformanceSnapshot {
        PerformanceSnapshot::empty(Utc::now())
    }

    #[test]
    fn test_all_healthy_when_below_thresholds() {
        let indicators = classify_health(
            &snapshot(),
            &Thresholds::default(),
            &ComponentSpec::defaults(),
            Utc::now(),
        );

        assert_eq!(indicators.len(), 3);
        assert!(indicators
            .iter()
            .all(|i| i.status == HealthStatus::Healthy && i.message.is_none()));
        assert_eq!(overall_health(&indicators), HealthStatus::Healthy);
    }

    #[test]
    fn test_warning_and_error_thresholds() {
        let thresholds = Thresholds::none().with(Metric::UpdateTime, Threshold::new(100.0, 200.0));
        let components = vec![ComponentSpec::new("Update Engine", vec![Metric::UpdateTime])];

        let mut s = snapshot();
        s.avg_update_time = 100.0;
        let status = classify_health(&s, &thresholds, &components, Utc::now())[0].status;
        assert_eq!(status, HealthStatus::Healthy);

        s.avg_update_time = 150.0;
        let status = classify_health(&s, &thresholds, &components, Utc::now())[0].status;
        assert_eq!(status, HealthStatus::Degraded);

        s.avg_update_time = 250.0;
        let indicator = &classify_health(&s, &thresholds, &components, Utc::now())[0];
        assert_eq!(indicator.status, HealthStatus::Failed);
        assert!(indicator.message.as_ref().unwrap().contains("error threshold"));
    }

    #[test]
    fn test_one_failed_component_fails_overall() {
        let mut s = snapshot();
        s.error_rate = 50.0;

        let indicators = classify_health(
            &s,
            &Thresholds::default(),
            &ComponentSpec::defaults(),
            Utc::now(),
        );

        let hierarchy = indicators
            .iter()
            .find(|i| i.component == "Hierarchy System")
            .unwrap();
        assert_eq!(hierarchy.status, HealthStatus::Failed);
        assert_eq!(overall_health(&indicators), HealthStatus::Failed);
    }

    #[test]
    fn test_memory_component_only_with_probe_value() {
        let mut s = snapshot();
        s.memory_usage = Some(150.0);

        let indicators = classify_health(
            &s,
            &Thresholds::default(),
            &ComponentSpec::defaults(),
            Utc::now(),
        );

        assert_eq!(indicators.len(), 4);
        let memory = indicators
            .iter()
            .find(|i| i.component == "Memory Usage")
            .unwrap();
        assert_eq!(memory.status, HealthStatus::Degraded);
        assert_eq!(overall_health(&indicators), HealthStatus::Degraded);
    }

    #[test]
    fn test_overall_health_of_nothing_is_healthy() {
        assert_eq!(overall_health(&[]), HealthStatus::Healthy);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    impl Arbitrary for HealthStatus {
        fn arbitrary(g: &mut Gen) -> Self {
            let choices = [
                HealthStatus::Healthy,
                HealthStatus::Degraded,
                HealthStatus::Failed,
            ];
            *g.choose(&choices).unwrap()
        }
    }

    // Overall health is failed whenever any single component failed
    #[quickcheck]
    fn prop_overall_is_worst_component(statuses: Vec<HealthStatus>) -> bool {
        let now = chrono::Utc::now();
        let indicators: Vec<HealthIndicator> = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| HealthIndicator {
                component: format!("component-{}", i),
                status: *status,
                message: None,
                last_update: now,
            })
            .collect();

        let overall = overall_health(&indicators);
        let any_failed = statuses.contains(&HealthStatus::Failed);
        let any_degraded = statuses.contains(&HealthStatus::Degraded);

        if any_failed {
            overall == HealthStatus::Failed
        } else if any_degraded {
            overall == HealthStatus::Degraded
        } else {
            overall == HealthStatus::Healthy
        }
    }
}
