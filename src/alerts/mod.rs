/// Threshold alerts derived from each snapshot
pub mod alert_generator;

pub use alert_generator::{derive_alerts, Alert, AlertLevel};
