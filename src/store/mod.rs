/// Bounded entry buffer with admission control
pub mod log_store;

/// Fixed-window admission counter per (level, category)
pub mod rate_limiter;

/// Sensitive payload redaction
pub mod sanitizer;

/// JSON and CSV export
pub mod export;

pub use export::{export_entries, ExportFormat};
pub use log_store::{CleanupReport, EntryFilter, LogStats, LogStore};
pub use rate_limiter::RateLimiter;
pub use sanitizer::{Sanitizer, REDACTED};
