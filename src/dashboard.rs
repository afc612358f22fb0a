//! Text dashboard over published monitoring state
//!
//! Only presentation state lives here: whether the panel is minimized, which
//! tab is selected and a short history for the charts tab. The data itself
//! always comes from a [`DashboardState`].

use crate::aggregator::Metric;
use crate::classifier::{HealthStatus, TrendDirection};
use crate::monitoring::DashboardState;
use std::collections::VecDeque;
use std::fmt::Write;

/// Number of samples kept for the charts tab
pub const HISTORY_LEN: usize = 30;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardTab {
    #[default]
    Metrics,
    Health,
    Charts,
}

impl DashboardTab {
    pub const ALL: [DashboardTab; 3] = [
        DashboardTab::Metrics,
        DashboardTab::Health,
        DashboardTab::Charts,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            DashboardTab::Metrics => "Metrics",
            DashboardTab::Health => "Health",
            DashboardTab::Charts => "Charts",
        }
    }
}

/// View state of the dashboard panel
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    minimized: bool,
    tab: DashboardTab,
    update_time_history: VecDeque<f64>,
    error_rate_history: VecDeque<f64>,
}

impl DashboardView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn toggle_minimized(&mut self) {
        self.minimized = !self.minimized;
    }

    pub fn tab(&self) -> DashboardTab {
        self.tab
    }

    pub fn select_tab(&mut self, tab: DashboardTab) {
        self.tab = tab;
    }

    /// Remember a published state for the charts tab
    pub fn observe(&mut self, state: &DashboardState) {
        push_bounded(&mut self.update_time_history, state.snapshot.avg_update_time);
        push_bounded(&mut self.error_rate_history, state.snapshot.error_rate);
    }

    pub fn history_len(&self) -> usize {
        self.update_time_history.len()
    }

    /// Render the panel as text
    ///
    /// A minimized panel is a single status line.
    pub fn render(&self, state: &DashboardState) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "[{}] {} alert(s)",
            status_label(state.overall),
            state.alerts.len()
        );
        if self.minimized {
            return out;
        }

        out.push('\n');
        let tabs: Vec<String> = DashboardTab::ALL
            .iter()
            .map(|tab| {
                if *tab == self.tab {
                    format!("<{}>", tab.title())
                } else {
                    tab.title().to_string()
                }
            })
            .collect();
        let _ = writeln!(out, "{}", tabs.join(" | "));

        match self.tab {
            DashboardTab::Metrics => render_metrics(&mut out, state),
            DashboardTab::Health => render_health(&mut out, state),
            DashboardTab::Charts => self.render_charts(&mut out),
        }

        for alert in &state.alerts {
            let _ = writeln!(out, "! {} {}", alert.level, alert.message);
        }
        out
    }

    fn render_charts(&self, out: &mut String) {
        let _ = writeln!(
            out,
            "  update time  {}",
            sparkline(&self.update_time_history)
        );
        let _ = writeln!(
            out,
            "  error rate   {}",
            sparkline(&self.error_rate_history)
        );
    }
}

fn push_bounded(history: &mut VecDeque<f64>, value: f64) {
    history.push_back(value);
    while history.len() > HISTORY_LEN {
        history.pop_front();
    }
}

fn status_label(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Healthy => "HEALTHY",
        HealthStatus::Degraded => "DEGRADED",
        HealthStatus::Failed => "FAILED",
    }
}

fn trend_arrow(direction: TrendDirection) -> char {
    match direction {
        TrendDirection::Up => '↑',
        TrendDirection::Down => '↓',
        TrendDirection::Stable => '→',
    }
}

fn render_metrics(out: &mut String, state: &DashboardState) {
    for metric in Metric::ALL {
        let Some(value) = state.snapshot.value(metric) else {
            continue;
        };
        let arrow = state
            .trends
            .iter()
            .find(|trend| trend.metric == metric)
            .map_or(' ', |trend| trend_arrow(trend.direction));
        let _ = writeln!(
            out,
            "  {:<20} {:>9.1}{:<4} {}",
            metric.display_name(),
            value,
            metric.unit(),
            arrow
        );
    }
    let _ = writeln!(
        out,
        "  {:<20} {:>9.1}ms",
        "p95 update time", state.snapshot.p95_update_time
    );
    let _ = writeln!(
        out,
        "  {:<20} {:>9}",
        "entries in window", state.snapshot.sample_size
    );
}

fn render_health(out: &mut String, state: &DashboardState) {
    for indicator in &state.health {
        let _ = write!(
            out,
            "  {:<20} {}",
            indicator.component,
            status_label(indicator.status)
        );
        if let Some(message) = &indicator.message {
            let _ = write!(out, " ({})", message);
        }
        out.push('\n');
    }
}

/// Scale values onto block characters between their min and max
fn sparkline(values: &VecDeque<f64>) -> String {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    values
        .iter()
        .map(|value| {
            if span <= 0.0 {
                SPARK_LEVELS[0]
            } else {
                let level = ((value - min) / span * (SPARK_LEVELS.len() - 1) as f64).round();
                SPARK_LEVELS[level as usize]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{PerformanceSnapshot, Thresholds};
    use crate::alerts::derive_alerts;
    use crate::classifier::{classify_health, overall_health, ComponentSpec, Trend};
    use chrono::Utc;

    fn state_with_update_time(avg_update_time: f64) -> DashboardState {
        let now = Utc::now();
        let mut snapshot = PerformanceSnapshot::empty(now);
        snapshot.avg_update_time = avg_update_time;
        let thresholds = Thresholds::default();
        let health = classify_health(&snapshot, &thresholds, &ComponentSpec::defaults(), now);

        DashboardState {
            overall: overall_health(&health),
            alerts: derive_alerts(&snapshot, &thresholds),
            trends: vec![Trend {
                metric: Metric::UpdateTime,
                direction: TrendDirection::Up,
                change_percent: 50.0,
            }],
            snapshot,
            health,
        }
    }

    #[test]
    fn test_toggle_and_tab_selection() {
        let mut view = DashboardView::new();
        assert!(!view.is_minimized());
        assert_eq!(view.tab(), DashboardTab::Metrics);

        view.toggle_minimized();
        assert!(view.is_minimized());
        view.toggle_minimized();
        assert!(!view.is_minimized());

        view.select_tab(DashboardTab::Charts);
        assert_eq!(view.tab(), DashboardTab::Charts);
    }

    #[test]
    fn test_minimized_render_is_one_line() {
        let mut view = DashboardView::new();
        view.toggle_minimized();

        let rendered = view.render(&state_with_update_time(250.0));

        assert_eq!(rendered, "[FAILED] 1 alert(s)");
    }

    #[test]
    fn test_metrics_tab() {
        let view = DashboardView::new();
        let rendered = view.render(&state_with_update_time(120.0));

        assert!(rendered.starts_with("[DEGRADED] 1 alert(s)\n<Metrics> | Health | Charts\n"));
        assert!(rendered.contains("Average update time"));
        assert!(rendered.contains("120.0ms"));
        assert!(rendered.contains('↑'));
        assert!(rendered.contains("! warning Average update time is 120.0ms"));
        // No probe reading, no memory row
        assert!(!rendered.contains("Memory usage"));
    }

    #[test]
    fn test_health_tab() {
        let mut view = DashboardView::new();
        view.select_tab(DashboardTab::Health);

        let rendered = view.render(&state_with_update_time(250.0));

        assert!(rendered.contains("Update Engine"));
        assert!(rendered.contains("FAILED (Average update time 250.0ms exceeds error threshold)"));
        assert!(rendered.contains("Hierarchy System     HEALTHY"));
    }

    #[test]
    fn test_charts_history_is_bounded() {
        let mut view = DashboardView::new();
        view.select_tab(DashboardTab::Charts);

        for i in 0..(HISTORY_LEN + 10) {
            view.observe(&state_with_update_time(i as f64));
        }
        assert_eq!(view.history_len(), HISTORY_LEN);

        let rendered = view.render(&state_with_update_time(0.0));
        assert!(rendered.contains('▁'));
        assert!(rendered.contains('█'));
    }

    #[test]
    fn test_sparkline_flat_series() {
        let values: VecDeque<f64> = vec![3.0, 3.0, 3.0].into();
        assert_eq!(sparkline(&values), "▁▁▁");
        assert_eq!(sparkline(&VecDeque::new()), "");
    }
}
