/// Configuration structures and TOML loading
#[allow(clippy::module_inception)]
pub mod config;

pub use config::{
    AggregatorConfig, AnalyticsConfig, Config, LoggingConfig, RateLimitConfig, SanitizationConfig,
};
