//! Core entry types and enums for the observability core
//!
//! This module defines the fundamental data structures recorded by the log store:
//! severity levels, subsystem categories, structured context and the immutable
//! log entry itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Timestamp type for consistent time handling across the crate
pub type Timestamp = DateTime<Utc>;

/// Free-form key/value payload attached to an entry
pub type DataMap = Map<String, Value>;

/// Severity of a log entry, ordered by priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Very fine-grained tracing output
    Trace,
    /// Diagnostic output useful while developing
    Debug,
    /// Normal operational events
    Info,
    /// Something unexpected that did not fail
    Warn,
    /// A failure
    Error,
}

impl LogLevel {
    /// All levels in ascending priority order
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Matching level of the `log` facade, used for console mirroring
    pub fn as_log_level(&self) -> log::Level {
        match self {
            LogLevel::Trace => log::Level::Trace,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subsystem tag used for filtering and routing entries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    Hierarchy,
    Performance,
    UserInteraction,
    StateManagement,
    Validation,
    Accessibility,
    Responsive,
    Persistence,
    Analytics,
    System,
}

impl LogCategory {
    pub const ALL: [LogCategory; 10] = [
        LogCategory::Hierarchy,
        LogCategory::Performance,
        LogCategory::UserInteraction,
        LogCategory::StateManagement,
        LogCategory::Validation,
        LogCategory::Accessibility,
        LogCategory::Responsive,
        LogCategory::Persistence,
        LogCategory::Analytics,
        LogCategory::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Hierarchy => "hierarchy",
            LogCategory::Performance => "performance",
            LogCategory::UserInteraction => "user_interaction",
            LogCategory::StateManagement => "state_management",
            LogCategory::Validation => "validation",
            LogCategory::Accessibility => "accessibility",
            LogCategory::Responsive => "responsive",
            LogCategory::Persistence => "persistence",
            LogCategory::Analytics => "analytics",
            LogCategory::System => "system",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Viewport descriptor attached to an entry context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    /// Named breakpoint, e.g. "md"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakpoint: Option<String>,
}

/// Structured metadata describing where an entry originated
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogContext {
    /// Identifier of the component the entry is about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    /// Identifiers of the component's ancestors, root first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hierarchy_path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    /// Environment tag such as "development" or "production"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

impl LogContext {
    /// Context for a single component
    pub fn component(component_id: impl Into<String>) -> Self {
        Self {
            component_id: Some(component_id.into()),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.hierarchy_path = path;
        self
    }
}

/// Error captured alongside an entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapturedError {
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl CapturedError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// Capture a Rust error, using its source chain as the stack
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        let full_name = std::any::type_name::<E>();
        let name = full_name.rsplit("::").next().unwrap_or(full_name);

        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        Self {
            name: name.to_string(),
            message: err.to_string(),
            stack: if chain.is_empty() {
                None
            } else {
                Some(chain.join("\n"))
            },
        }
    }
}

/// One immutable structured log record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub category: LogCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<LogContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CapturedError>,
    pub timestamp: Timestamp,
}

impl LogEntry {
    pub fn new(
        level: LogLevel,
        category: LogCategory,
        message: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            level,
            category,
            message: message.into(),
            context: None,
            data: None,
            error: None,
            timestamp,
        }
    }

    pub fn with_context(mut self, context: LogContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_data(mut self, data: DataMap) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, error: CapturedError) -> Self {
        self.error = Some(error);
        self
    }

    /// Numeric `duration` field of the payload, in milliseconds
    pub fn duration(&self) -> Option<f64> {
        self.data.as_ref()?.get("duration")?.as_f64()
    }

    pub fn component_id(&self) -> Option<&str> {
        self.context.as_ref()?.component_id.as_deref()
    }
}
