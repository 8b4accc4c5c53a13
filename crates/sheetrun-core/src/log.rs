//! Leveled, timestamped run log lines.

use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a run log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Marker written in front of the message, e.g. `[WARN]`.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Info => "[INFO]",
            Self::Warn => "[WARN]",
            Self::Error => "[ERROR]",
        }
    }
}

/// A single line of a run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    /// Create a line stamped with the current local time.
    ///
    /// Line breaks inside `message` are flattened so the line stays one
    /// physical line in the log file.
    pub fn new(level: LogLevel, message: impl AsRef<str>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: flatten(message.as_ref()),
        }
    }

    pub fn info(message: impl AsRef<str>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warn(message: impl AsRef<str>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    pub fn error(message: impl AsRef<str>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Text of the line as written to the log file, without trailing newline.
    pub fn to_file_line(&self) -> String {
        format!(
            "{} {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
            self
        )
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level.marker(), self.message)
    }
}

fn flatten(message: &str) -> String {
    if !message.contains(['\n', '\r']) {
        return message.to_string();
    }
    message
        .split(['\n', '\r'])
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_has_level_marker() {
        assert_eq!(LogLine::info("saved").to_string(), "[INFO] saved");
        assert_eq!(LogLine::warn("odd row").to_string(), "[WARN] odd row");
        assert_eq!(LogLine::error("boom").to_string(), "[ERROR] boom");
    }

    #[test]
    fn test_multiline_message_is_flattened() {
        let line = LogLine::error("first\nsecond\r\n\nthird");
        assert_eq!(line.message, "first second third");
    }

    #[test]
    fn test_carriage_return_is_flattened() {
        let line = LogLine::info("reading row 10\rreading row 20");
        assert_eq!(line.message, "reading row 10 reading row 20");
        assert!(!line.to_file_line().contains('\r'));
    }

    #[test]
    fn test_file_line_ends_with_display() {
        let line = LogLine::warn("check payroll");
        let file_line = line.to_file_line();
        assert!(file_line.ends_with("[WARN] check payroll"));
        assert!(!file_line.contains('\n'));
    }
}
