//! Log event model: severity levels and the per-call event structure.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;

/// Severity level attached to every log event.
///
/// Ordered so that level-threshold filtering can use plain comparison
/// (`Debug < Info < Warn < Error < Critical`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl LogLevel {
    /// Upper-case name as it appears in rendered output.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Parse a level name case-insensitively, accepting both `WARN` and
    /// `WARNING` spellings.
    pub fn parse(value: &str) -> Option<LogLevel> {
        match value.to_uppercase().as_str() {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" | "WARNING" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            "CRITICAL" => Some(LogLevel::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structured log event.
///
/// Created fresh per log call. Processors take ownership of the field map and
/// return a new one; nothing is mutated in place once the event reaches the
/// renderer.
#[derive(Debug, Clone)]
pub struct LogEvent {
    /// UTC timestamp taken when the event was built.
    pub timestamp: DateTime<Utc>,
    /// Severity level.
    pub level: LogLevel,
    /// Component name of the logger that emitted the event.
    pub logger: String,
    /// Event name, e.g. `user_login` or `request_completed`.
    pub message: String,
    /// Arbitrary structured fields (string, number, boolean, or nested map).
    pub fields: Map<String, Value>,
    /// Attached error text, appended as a trailing block by the human
    /// renderer and as an `exception` field by the JSON renderer.
    pub error: Option<String>,
}

impl LogEvent {
    /// Create a new event with an empty field map, timestamped now.
    pub fn new(level: LogLevel, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            logger: logger.into(),
            message: message.into(),
            fields: Map::new(),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Critical);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("INFO"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("warn"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("Warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("nope"), None);
    }

    #[test]
    fn test_new_event_is_empty() {
        let event = LogEvent::new(LogLevel::Info, "item_manager", "item_created");
        assert_eq!(event.logger, "item_manager");
        assert_eq!(event.message, "item_created");
        assert!(event.fields.is_empty());
        assert!(event.error.is_none());
    }
}
