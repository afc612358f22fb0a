use crate::error::AnalyticsError;
use crate::events::{DataMap, LogEntry, Timestamp};
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Event sent to an analytics collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsEvent {
    pub name: String,
    pub properties: DataMap,
    pub timestamp: Timestamp,
}

impl AnalyticsEvent {
    /// Event name used when forwarding individual log entries
    pub const LOG_ENTRY: &'static str = "log_entry";

    pub fn new(name: impl Into<String>, properties: DataMap, timestamp: Timestamp) -> Self {
        Self {
            name: name.into(),
            properties,
            timestamp,
        }
    }

    /// Build the forwarded form of a stored entry
    ///
    /// Only routing fields travel; the payload stays local.
    pub fn from_entry(entry: &LogEntry) -> Self {
        let mut properties = DataMap::new();
        properties.insert("level".to_string(), Value::from(entry.level.as_str()));
        properties.insert("category".to_string(), Value::from(entry.category.as_str()));
        properties.insert("message".to_string(), Value::from(entry.message.clone()));
        if let Some(component_id) = entry.component_id() {
            properties.insert("componentId".to_string(), Value::from(component_id));
        }
        properties.insert("hasError".to_string(), Value::from(entry.error.is_some()));

        Self::new(Self::LOG_ENTRY, properties, entry.timestamp)
    }
}

/// Receiver of analytics events
///
/// Implementations must not block the caller: anything slow has to be handed
/// off. An `Err` means the event was not accepted; callers log and move on.
#[cfg_attr(test, mockall::automock)]
pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError>;
}

/// Sink posting events as JSON to an HTTP collector
///
/// Each event is sent on its own task of the current tokio runtime; delivery
/// failures are logged and never reach the caller.
pub struct HttpAnalyticsSink {
    client: Client,
    endpoint: String,
}

impl HttpAnalyticsSink {
    /// Create a sink for the given collector URL
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::HttpError` if the HTTP client cannot be built.
    pub fn new(endpoint: String) -> Result<Self, AnalyticsError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl AnalyticsSink for HttpAnalyticsSink {
    fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| AnalyticsError::NoRuntime)?;

        let client = self.client.clone();
        let endpoint = self.endpoint.clone();

        handle.spawn(async move {
            match client.post(&endpoint).json(&event).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Delivered analytics event '{}'", event.name);
                }
                Ok(response) => {
                    warn!(
                        "Analytics collector rejected '{}' with status {}",
                        event.name,
                        response.status()
                    );
                }
                Err(e) => {
                    warn!("Failed to deliver analytics event '{}': {}", event.name, e);
                }
            }
        });

        Ok(())
    }
}

/// Sink writing events to the `log` facade
#[derive(Debug, Default)]
pub struct LogAnalyticsSink;

impl AnalyticsSink for LogAnalyticsSink {
    fn track(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        let properties = serde_json::to_string(&event.properties)?;
        info!(target: "lookout::analytics", "{} {}", event.name, properties);
        Ok(())
    }
}
