//! Periodic sampling of the log store into dashboard state
//!
//! The [`MetricsEngine`] turns the current aggregation window into a snapshot,
//! trends against the previous snapshot, component health and alerts, and
//! publishes the result on a watch channel. [`MonitorRuntime`] drives the
//! engine and the store's housekeeping from scheduled tasks.

use crate::aggregator::{compute_snapshot, PerformanceSnapshot};
use crate::alerts::{derive_alerts, Alert};
use crate::classifier::{
    classify_health, compute_trends, overall_health, ComponentSpec, HealthIndicator, HealthStatus,
    Trend,
};
use crate::config::{AggregatorConfig, Config};
use crate::events::Timestamp;
use crate::logger::Logger;
use crate::scheduler::ScheduledTask;
use log::{debug, info};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Source of the host process's resident memory
#[cfg_attr(test, mockall::automock)]
pub trait MemoryProbe: Send {
    /// Resident memory in megabytes, if it can be determined
    fn memory_mb(&self) -> Option<f64>;
}

/// Reads the resident set size of the current process
#[derive(Debug, Default)]
pub struct ProcessMemoryProbe;

impl MemoryProbe for ProcessMemoryProbe {
    fn memory_mb(&self) -> Option<f64> {
        resident_kb().map(|kb| kb as f64 / 1024.0)
    }
}

/// Resident memory of this process in kilobytes
fn resident_kb() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss = status
                .lines()
                .find(|line| line.starts_with("VmRSS:"))
                .and_then(|line| line.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<u64>().ok());
            if rss.is_some() {
                return rss;
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        use std::process::Command;

        if let Ok(output) = Command::new("ps")
            .args(["-o", "rss=", "-p", &std::process::id().to_string()])
            .output()
        {
            if let Ok(kb) = String::from_utf8_lossy(&output.stdout).trim().parse::<u64>() {
                return Some(kb);
            }
        }
    }

    #[cfg(unix)]
    {
        // Peak rather than current usage
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
        if unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) } == 0 {
            // ru_maxrss is in KB on Linux, bytes on macOS
            #[cfg(target_os = "macos")]
            return Some(usage.ru_maxrss as u64 / 1024);

            #[cfg(not(target_os = "macos"))]
            return Some(usage.ru_maxrss as u64);
        }
    }

    None
}

/// Everything a dashboard renders for one cycle
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub snapshot: PerformanceSnapshot,
    pub trends: Vec<Trend>,
    pub health: Vec<HealthIndicator>,
    pub overall: HealthStatus,
    pub alerts: Vec<Alert>,
}

impl DashboardState {
    /// State published before the first sample
    pub fn initial(timestamp: Timestamp) -> Self {
        Self {
            snapshot: PerformanceSnapshot::empty(timestamp),
            trends: Vec::new(),
            health: Vec::new(),
            overall: HealthStatus::Healthy,
            alerts: Vec::new(),
        }
    }
}

/// Computes and publishes dashboard state from the logger's store
pub struct MetricsEngine {
    logger: Logger,
    config: AggregatorConfig,
    components: Vec<ComponentSpec>,
    probe: Option<Box<dyn MemoryProbe>>,
    /// Only state carried between cycles
    previous: Option<PerformanceSnapshot>,
    sender: watch::Sender<DashboardState>,
}

impl MetricsEngine {
    pub fn new(logger: Logger, config: AggregatorConfig) -> Self {
        let (sender, _) = watch::channel(DashboardState::initial(logger.clock().now()));
        Self {
            logger,
            config,
            components: ComponentSpec::defaults(),
            probe: None,
            previous: None,
            sender,
        }
    }

    pub fn with_probe(mut self, probe: Box<dyn MemoryProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_components(mut self, components: Vec<ComponentSpec>) -> Self {
        self.components = components;
        self
    }

    /// Run one aggregation cycle and publish its result
    ///
    /// Entries are copied out of the store under a single lock, so the
    /// snapshot is a consistent view even while other threads keep logging.
    pub fn sample(&mut self) -> DashboardState {
        let now = self.logger.clock().now();
        let window = self.config.window();
        let entries = self.logger.entries_after(now - window);
        let memory = self.probe.as_ref().and_then(|probe| probe.memory_mb());

        let snapshot = compute_snapshot(&entries, now, window, memory);
        let trends = self
            .previous
            .as_ref()
            .map(|previous| compute_trends(previous, &snapshot, &self.config.trend))
            .unwrap_or_default();
        let health = classify_health(&snapshot, &self.config.thresholds, &self.components, now);
        let overall = overall_health(&health);
        let alerts = derive_alerts(&snapshot, &self.config.thresholds);

        debug!(
            "Sampled {} entries: overall {:?}, {} alerts",
            snapshot.sample_size,
            overall,
            alerts.len()
        );

        self.previous = Some(snapshot.clone());
        let state = DashboardState {
            snapshot,
            trends,
            health,
            overall,
            alerts,
        };
        self.sender.send_replace(state.clone());
        state
    }

    /// Receiver of every published state
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.sender.subscribe()
    }

    /// Most recently published state
    pub fn current(&self) -> DashboardState {
        self.sender.borrow().clone()
    }
}

/// The periodic work of a running monitor
///
/// Holds the retention sweep, the sampling loop and, when analytics reporting
/// is enabled, the performance summary report. [`MonitorRuntime::shutdown`] or
/// dropping the runtime cancels all of them.
pub struct MonitorRuntime {
    tasks: Vec<ScheduledTask>,
}

impl MonitorRuntime {
    /// Start the scheduled tasks on the current tokio runtime
    ///
    /// # Arguments
    ///
    /// * `logger` - Logger whose store is swept and whose summaries are reported
    /// * `engine` - Engine sampled on every update interval
    /// * `config` - Intervals and feature switches
    pub fn start(logger: Logger, engine: Arc<Mutex<MetricsEngine>>, config: &Config) -> Self {
        let mut tasks = Vec::new();

        let cleanup_logger = logger.clone();
        tasks.push(ScheduledTask::spawn(
            "retention-sweep",
            config.logging.cleanup_interval(),
            move || {
                cleanup_logger.cleanup();
            },
        ));

        tasks.push(ScheduledTask::spawn(
            "metrics-sampling",
            config.aggregator.update_interval(),
            move || {
                engine.lock().unwrap_or_else(|e| e.into_inner()).sample();
            },
        ));

        if config.logging.enable_analytics_reporting {
            let report_logger = logger;
            tasks.push(ScheduledTask::spawn(
                "performance-report",
                config.analytics.report_interval(),
                move || {
                    report_logger.report_performance();
                },
            ));
        }

        info!("Monitoring runtime started with {} tasks", tasks.len());
        Self { tasks }
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(ScheduledTask::is_running)
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(ScheduledTask::name).collect()
    }

    /// Stop every task
    pub fn shutdown(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for task in &mut self.tasks {
            task.stop();
        }
        self.tasks.clear();
        info!("Monitoring runtime stopped");
    }
}

impl Drop for MonitorRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
