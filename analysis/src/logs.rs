//! Progress messages for loading, analysis and export.
//!
//! The `marks` binary only sees the stderr lines. A program driving the
//! library can [`subscribe`](LogBroadcaster::subscribe) instead and get the
//! same entries as values, breakdown tables included (one entry per line).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Entries a slow subscriber may fall behind by before it sees `Lagged`.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Marker printed in front of the message on stderr.
    pub fn marker(self) -> &'static str {
        match self {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        }
    }
}

/// One progress message, e.g. a file written or a row of a summary table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Depth under the preceding heading; tables sit at 1
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into(), indent: 0 }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// The line written to stderr.
    pub fn render(&self) -> String {
        format!("{}{} {}", "   ".repeat(self.indent as usize), self.level.marker(), self.message)
    }
}

/// Shared by the loader, the pipeline and the CLI.
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Writes entries to stderr and forwards them to subscribers.
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn log(&self, entry: LogEntry) {
        eprintln!("{}", entry.render());
        // Err only means nobody is subscribed
        let _ = self.sender.send(entry);
    }

    /// Entries logged after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::warning(msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::error(msg));
}

/// Info at `indent`, split so every line of a rendered table is its own entry.
pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    for line in msg.into().lines() {
        LOG_BROADCASTER.log(LogEntry::info(line).with_indent(indent));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_receives_entries() {
        let broadcaster = LogBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.log(LogEntry::success("saved marks_by_Examiner.csv"));
        broadcaster.log(LogEntry::warning("duplicate script").with_indent(2));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.level, LogLevel::Success);
        assert_eq!(first.message, "saved marks_by_Examiner.csv");

        let second = rx.try_recv().unwrap();
        assert_eq!(second.level, LogLevel::Warning);
        assert_eq!(second.indent, 2);
    }

    #[test]
    fn test_log_without_subscribers() {
        let broadcaster = LogBroadcaster::new();
        broadcaster.log(LogEntry::info("nobody listening"));
    }

    #[test]
    fn test_render_indents_under_marker() {
        assert_eq!(LogEntry::info("| Total |").with_indent(1).render(), "       | Total |");
        assert_eq!(LogEntry::success("done").render(), "   ✓ done");
    }

    #[test]
    fn test_entry_serializes_lowercase_level() {
        let json = serde_json::to_string(&LogEntry::error("boom")).unwrap();
        assert!(json.contains("\"level\":\"error\""));
    }
}
