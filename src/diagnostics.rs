use std::sync::{Mutex, PoisonError};

/// Side channel for the library's own operational messages.
///
/// This is distinct from the trace records being dispatched: it reports
/// things like "connected to PostgreSQL" or "falling back to console".
pub trait Diagnostics: Send + Sync {
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// [`Diagnostics`] that forwards to `tracing` events under the
/// `trace_log_dispatch` target. See [`crate::init`] for installing a
/// subscriber that prints them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn info(&self, message: &str) {
        tracing::info!(target: "trace_log_dispatch", "{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!(target: "trace_log_dispatch", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "trace_log_dispatch", "{message}");
    }
}

/// Severity of a captured diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// [`Diagnostics`] that keeps every message in memory.
///
/// Useful for tests that assert on fallback warnings without installing
/// a global subscriber.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    messages: Mutex<Vec<(DiagnosticLevel, String)>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(DiagnosticLevel, String)> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages recorded at `level`, oldest first.
    pub fn at(&self, level: DiagnosticLevel) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.at(DiagnosticLevel::Warning)
    }

    fn push(&self, level: DiagnosticLevel, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn info(&self, message: &str) {
        self.push(DiagnosticLevel::Info, message);
    }

    fn warning(&self, message: &str) {
        self.push(DiagnosticLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(DiagnosticLevel::Error, message);
    }
}
