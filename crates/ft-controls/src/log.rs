//! Append-only event log for the control loop.
//!
//! Every entry is timestamped and tagged. One line per notable event per
//! cycle; there is no schema beyond tag, timestamp and free text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogTag {
    Status,
    Warning,
    Error,
    Diagnostic,
}

impl LogTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "STATUS",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Diagnostic => "DIAGNOSTIC",
        }
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub tag: LogTag,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {}",
            self.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.tag,
            self.message
        )
    }
}

/// Destination for log lines.
pub trait LogSink {
    fn append(&mut self, tag: LogTag, message: String);

    fn status(&mut self, message: String) {
        self.append(LogTag::Status, message);
    }

    fn warning(&mut self, message: String) {
        self.append(LogTag::Warning, message);
    }

    fn error(&mut self, message: String) {
        self.append(LogTag::Error, message);
    }

    fn diagnostic(&mut self, message: String) {
        self.append(LogTag::Diagnostic, message);
    }
}

/// Forwards entries to `tracing`, one event per line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn append(&mut self, tag: LogTag, message: String) {
        match tag {
            LogTag::Status => tracing::info!(tag = tag.as_str(), "{message}"),
            LogTag::Warning => tracing::warn!(tag = tag.as_str(), "{message}"),
            LogTag::Error => tracing::error!(tag = tag.as_str(), "{message}"),
            LogTag::Diagnostic => tracing::debug!(tag = tag.as_str(), "{message}"),
        }
    }
}

/// Keeps every entry in memory, in order.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    entries: Vec<LogEntry>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn with_tag(&self, tag: LogTag) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.tag == tag)
    }

    /// Whether any entry with `tag` contains `needle`.
    pub fn contains(&self, tag: LogTag, needle: &str) -> bool {
        self.with_tag(tag).any(|e| e.message.contains(needle))
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

impl LogSink for MemorySink {
    fn append(&mut self, tag: LogTag, message: String) {
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            tag,
            message,
        });
    }
}

/// Writes every entry to two sinks.
#[derive(Debug, Default, Clone)]
pub struct TeeSink<A, B> {
    pub first: A,
    pub second: B,
}

impl<A, B> TeeSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: LogSink, B: LogSink> LogSink for TeeSink<A, B> {
    fn append(&mut self, tag: LogTag, message: String) {
        self.first.append(tag, message.clone());
        self.second.append(tag, message);
    }
}

impl<T: LogSink + ?Sized> LogSink for &mut T {
    fn append(&mut self, tag: LogTag, message: String) {
        (**self).append(tag, message);
    }
}
