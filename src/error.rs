use thiserror::Error;

/// Errors that can occur when forwarding events to an analytics collaborator
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Failed to send analytics event: {0}")]
    SendFailed(String),

    #[error("No async runtime available to forward analytics event")]
    NoRuntime,

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Errors raised by the strict measurement API
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimingError {
    #[error("Unknown measurement id: {0}")]
    UnknownMeasurement(u64),
}

/// Errors that can occur while exporting stored log entries
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("JSON export failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Export output was not valid UTF-8")]
    Utf8Error,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
