use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Where the rewriter reports what it did to each step. Supplied by the
/// caller so the host decides how lines are surfaced.
pub trait LogSink {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

impl<T: LogSink + ?Sized> LogSink for &T {
    fn info(&self, message: &str) {
        (**self).info(message);
    }

    fn warn(&self, message: &str) {
        (**self).warn(message);
    }
}

/// Forwards every line to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn info(&self, message: &str) {
        tracing::info!(target: "ddsls::stepfunctions", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "ddsls::stepfunctions", "{message}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
}

/// Keeps lines in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<LogLine>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|line| line.level == level)
            .map(|line| line.message)
            .collect()
    }

    pub fn take(&self) -> Vec<LogLine> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn push(&self, level: LogLevel, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogLine {
                level,
                message: message.to_string(),
            });
    }
}

impl LogSink for MemoryLogSink {
    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(LogLevel::Warn, message);
    }
}

/// Records lines in memory and forwards them to another sink.
#[derive(Debug)]
pub struct TeeLogSink<S> {
    memory: MemoryLogSink,
    inner: S,
}

impl<S: LogSink> TeeLogSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            memory: MemoryLogSink::new(),
            inner,
        }
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.memory.lines()
    }
}

impl<S: LogSink> LogSink for TeeLogSink<S> {
    fn info(&self, message: &str) {
        self.memory.info(message);
        self.inner.info(message);
    }

    fn warn(&self, message: &str) {
        self.memory.warn(message);
        self.inner.warn(message);
    }
}

#[cfg(test)]
#[path = "log_sink_test.rs"]
mod tests;
