/// Trend direction between consecutive snapshots
pub mod trend;

/// Component health classification
pub mod health;

pub use health::{classify_health, overall_health, ComponentSpec, HealthIndicator, HealthStatus};
pub use trend::{compare_trend, compute_trends, Trend, TrendConfig, TrendDirection};
