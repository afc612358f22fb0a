//! Redaction of sensitive payload fields

use crate::config::SanitizationConfig;
use crate::events::DataMap;
use serde_json::Value;
use std::collections::HashSet;

/// Marker stored in place of a redacted value
pub const REDACTED: &str = "[REDACTED]";

/// Replaces the values of sensitive top-level payload keys
///
/// Keys match exactly; nested objects are not walked.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    enabled: bool,
    sensitive_fields: HashSet<String>,
}

impl Sanitizer {
    pub fn new(config: &SanitizationConfig) -> Self {
        Self {
            enabled: config.enabled,
            sensitive_fields: config.sensitive_fields.iter().cloned().collect(),
        }
    }

    pub fn sanitize(&self, mut data: DataMap) -> DataMap {
        if !self.enabled {
            return data;
        }
        for (key, value) in data.iter_mut() {
            if self.sensitive_fields.contains(key) {
                *value = Value::String(REDACTED.to_string());
            }
        }
        data
    }
}
