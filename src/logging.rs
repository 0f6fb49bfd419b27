use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Severity levels for shard log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the canonical uppercase representation.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size-based rotation policy for in-memory log segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRotationPolicy {
    pub max_bytes: usize,
    pub max_segments: usize,
}

impl Default for LogRotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 1 << 20,
            max_segments: 4,
        }
    }
}

/// Accumulated log lines for one rotated segment.
#[derive(Debug, Default, Clone)]
pub struct LogSegment {
    lines: Vec<String>,
    bytes_written: usize,
}

impl LogSegment {
    /// Lines contained within the segment.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Total bytes recorded before rotation.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }
}

/// Per-shard JSON-line logger with deterministic rotation semantics. Each
/// shard processor owns its own logger, so records never interleave across
/// shards.
#[derive(Debug, Clone)]
pub struct ShardLogger {
    shard_id: String,
    policy: LogRotationPolicy,
    current_level: LogLevel,
    segments: VecDeque<LogSegment>,
    active: LogSegment,
}

impl ShardLogger {
    /// Creates a logger bound to one shard with the provided rotation policy.
    pub fn new(shard_id: impl Into<String>, policy: LogRotationPolicy) -> Self {
        Self {
            shard_id: shard_id.into(),
            policy,
            current_level: LogLevel::Info,
            segments: VecDeque::new(),
            active: LogSegment::default(),
        }
    }

    /// Returns the current severity floor.
    pub fn level(&self) -> LogLevel {
        self.current_level
    }

    /// Applies a dynamic log-level override.
    pub fn set_level(&mut self, level: LogLevel) {
        self.current_level = level;
    }

    /// Emits a JSON-line log record attributed to this shard; `seq` is the
    /// stream position the record refers to (0 when none applies).
    pub fn log(
        &mut self,
        ts_ms: u64,
        level: LogLevel,
        seq: u64,
        message: &str,
    ) -> Result<(), LoggingError> {
        if level < self.current_level {
            return Ok(());
        }
        let record = LogRecord {
            ts: ts_ms,
            level: level.as_str(),
            shard_id: &self.shard_id,
            seq,
            message,
        };
        let line = serde_json::to_string(&record).map_err(LoggingError::Serialize)?;
        self.rotate_if_needed(line.len());
        self.active.bytes_written = self.active.bytes_written.saturating_add(line.len());
        self.active.lines.push(line);
        Ok(())
    }

    /// Returns rotated segments followed by the active one.
    pub fn segments(&self) -> impl Iterator<Item = &LogSegment> {
        self.segments.iter().chain(std::iter::once(&self.active))
    }

    /// All retained lines across segments, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.segments()
            .flat_map(|segment| segment.lines().iter().map(String::as_str))
    }

    fn rotate_if_needed(&mut self, next_line_len: usize) {
        if self.active.bytes_written + next_line_len <= self.policy.max_bytes {
            return;
        }
        if !self.active.lines.is_empty() {
            self.segments.push_back(std::mem::take(&mut self.active));
            while self.segments.len() > self.policy.max_segments {
                self.segments.pop_front();
            }
        }
        self.active = LogSegment::default();
    }
}

/// Errors surfaced while serializing JSON-line records.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct LogRecord<'a> {
    ts: u64,
    level: &'a str,
    shard_id: &'a str,
    seq: u64,
    message: &'a str,
}
