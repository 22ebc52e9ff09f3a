//! Injectable logging capability.
//!
//! Components receive an `Arc<dyn DebateLogger>` at construction; the
//! process entry point decides which implementation to use.

use std::fmt::Display;
use std::sync::{Arc, Mutex};

pub trait DebateLogger: Send + Sync {
    /// Record a notable event.
    fn log(&self, event: &str, detail: &str);

    /// Record a failure that was handled (e.g. a fallback was taken).
    fn log_error(&self, event: &str, error: &dyn Display);

    /// Record a completed inbound request.
    fn log_request(&self, method: &str, path: &str, status: u16, elapsed_ms: u128);
}

/// Forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl DebateLogger for TracingLogger {
    fn log(&self, event: &str, detail: &str) {
        tracing::info!(event, "{}", detail);
    }

    fn log_error(&self, event: &str, error: &dyn Display) {
        tracing::warn!(event, error = %error, "handled failure");
    }

    fn log_request(&self, method: &str, path: &str, status: u16, elapsed_ms: u128) {
        tracing::info!(method, path, status, elapsed_ms = elapsed_ms as u64, "request");
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl DebateLogger for NullLogger {
    fn log(&self, _event: &str, _detail: &str) {}
    fn log_error(&self, _event: &str, _error: &dyn Display) {}
    fn log_request(&self, _method: &str, _path: &str, _status: u16, _elapsed_ms: u128) {}
}

/// Keeps log lines in memory so tests can assert on them.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    fn push(&self, line: String) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

impl DebateLogger for MemoryLogger {
    fn log(&self, event: &str, detail: &str) {
        self.push(format!("{}: {}", event, detail));
    }

    fn log_error(&self, event: &str, error: &dyn Display) {
        self.push(format!("error {}: {}", event, error));
    }

    fn log_request(&self, method: &str, path: &str, status: u16, elapsed_ms: u128) {
        self.push(format!("{} {} {} ({}ms)", method, path, status, elapsed_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_records_in_order() {
        let logger = MemoryLogger::new();
        logger.log("session.created", "abc");
        logger.log_error("ai.fallback", &"timeout");
        logger.log_request("GET", "/api/health", 200, 3);

        assert_eq!(
            logger.lines(),
            vec![
                "session.created: abc".to_string(),
                "error ai.fallback: timeout".to_string(),
                "GET /api/health 200 (3ms)".to_string(),
            ]
        );
    }
}
