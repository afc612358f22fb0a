//! JSON and CSV export of stored entries

use crate::error::ExportError;
use crate::events::LogEntry;
use chrono::SecondsFormat;
use std::fmt;
use std::str::FromStr;

/// Column names of the CSV export
pub const CSV_HEADER: [&str; 7] = [
    "timestamp",
    "level",
    "category",
    "message",
    "componentId",
    "hierarchyPath",
    "hasError",
];

/// Output format of [`export_entries`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Csv => f.write_str("csv"),
        }
    }
}

/// Serialize entries in the requested format
///
/// JSON is the full entry array. CSV carries one quoted row per entry with the
/// hierarchy path joined by `/`.
pub fn export_entries(entries: &[LogEntry], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
        ExportFormat::Csv => export_csv(entries),
    }
}

fn export_csv(entries: &[LogEntry]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;

    for entry in entries {
        let (component_id, hierarchy_path) = match &entry.context {
            Some(context) => (
                context.component_id.clone().unwrap_or_default(),
                context.hierarchy_path.join("/"),
            ),
            None => (String::new(), String::new()),
        };

        writer.write_record([
            entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            entry.level.to_string(),
            entry.category.to_string(),
            entry.message.clone(),
            component_id,
            hierarchy_path,
            entry.error.is_some().to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|_| ExportError::Utf8Error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CapturedError, DataMap, LogCategory, LogContext, LogLevel};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn sample_entries() -> Vec<LogEntry> {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut data = DataMap::new();
        data.insert("duration".to_string(), json!(12.5));

        vec![
            LogEntry::new(LogLevel::Info, LogCategory::Hierarchy, "moved \"card\"", ts)
                .with_context(
                    LogContext::component("card-1")
                        .with_path(vec!["root".to_string(), "grid".to_string()]),
                )
                .with_data(data),
            LogEntry::new(LogLevel::Error, LogCategory::Validation, "bad, drop", ts)
                .with_error(CapturedError::new("DropError", "no")),
        ]
    }

    #[test]
    fn test_json_round_trip() {
        let entries = sample_entries();
        let exported = export_entries(&entries, ExportFormat::Json).unwrap();
        let parsed: Vec<LogEntry> = serde_json::from_str(&exported).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_json_round_trip_keeps_measured_durations_exact() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let entries: Vec<LogEntry> = (0..2000)
            .map(|i| {
                let i = i as f64;
                let mut data = DataMap::new();
                data.insert(
                    "duration".to_string(),
                    json!(i * 0.1234567891234567 + 1e-7 * i.sqrt()),
                );
                LogEntry::new(LogLevel::Info, LogCategory::Performance, "render", ts)
                    .with_data(data)
            })
            .collect();

        let exported = export_entries(&entries, ExportFormat::Json).unwrap();
        let parsed: Vec<LogEntry> = serde_json::from_str(&exported).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_csv_layout() {
        let exported = export_entries(&sample_entries(), ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = exported.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            concat!(
                "\"timestamp\",\"level\",\"category\",\"message\",",
                "\"componentId\",\"hierarchyPath\",\"hasError\""
            )
        );
        assert_eq!(
            lines[1],
            concat!(
                "\"2024-05-01T12:00:00.000Z\",\"info\",\"hierarchy\",",
                "\"moved \"\"card\"\"\",\"card-1\",\"root/grid\",\"false\""
            )
        );
        assert_eq!(
            lines[2],
            "\"2024-05-01T12:00:00.000Z\",\"error\",\"validation\",\"bad, drop\",\"\",\"\",\"true\""
        );
    }

    #[test]
    fn test_empty_csv_has_header_only() {
        let exported = export_entries(&[], ExportFormat::Csv).unwrap();
        assert_eq!(exported.lines().count(), 1);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }
}
