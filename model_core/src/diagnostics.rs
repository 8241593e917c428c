//! # Diagnostics
//!
//! Materialization never fails the caller for a malformed document; it
//! records what was imperfect instead. A [`DiagnosticSink`] receives those
//! records. Sinks are fire-and-forget and must accept concurrent writes.
//!
//! - [`DiagnosticLog`] collects records and mirrors each one as a `tracing`
//!   event at the matching level.
//! - [`NullSink`] discards everything.
//!
//! ## Example
//!
//! ```rust
//! use model_core::diagnostics::{DiagnosticLog, DiagnosticSink, Severity};
//!
//! let log = DiagnosticLog::new();
//! log.record_warning("property `ExtraNote` stored in extension data".to_string());
//! assert!(!log.has_errors());
//! assert_eq!(log.snapshot()[0].severity, Severity::Warning);
//! ```

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::{Failure, FailureKind};

/// Severity of a diagnostic record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };
        write!(f, "{}", label)
    }
}

/// A single diagnostic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Failure classification, when the record stems from one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: Option<FailureKind>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            kind,
            message: message.into(),
        }
    }

    pub fn warning(kind: Option<FailureKind>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            kind,
            message: message.into(),
        }
    }

    pub fn note(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Note,
            kind: None,
            message: message.into(),
        }
    }
}

impl From<&Failure> for Diagnostic {
    fn from(failure: &Failure) -> Self {
        Diagnostic::error(Some(failure.kind), failure.message.clone())
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "{} [{}]: {}", self.severity, kind, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Receiver of diagnostic records. Never blocks materialization, never fails.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, diagnostic: Diagnostic);

    fn record_error(&self, message: String) {
        self.record(Diagnostic::error(None, message));
    }

    fn record_warning(&self, message: String) {
        self.record(Diagnostic::warning(None, message));
    }

    fn record_note(&self, message: String) {
        self.record(Diagnostic::note(message));
    }

    fn record_failure(&self, failure: &Failure) {
        self.record(Diagnostic::from(failure));
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _diagnostic: Diagnostic) {}
}

/// Thread-safe collector of diagnostic records.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    records: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        DiagnosticLog::default()
    }

    /// Copy of every record so far
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.records.lock().clone()
    }

    /// Drain every record
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.records.lock())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any Error was recorded. This is the failure flag of a call:
    /// every codec reports failures as Errors, so no separate flag exists.
    pub fn has_errors(&self) -> bool {
        self.records.lock().iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> Vec<Diagnostic> {
        self.filtered(Severity::Error)
    }

    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.filtered(Severity::Warning)
    }

    pub fn notes(&self) -> Vec<Diagnostic> {
        self.filtered(Severity::Note)
    }

    fn filtered(&self, severity: Severity) -> Vec<Diagnostic> {
        self.records
            .lock()
            .iter()
            .filter(|d| d.severity == severity)
            .cloned()
            .collect()
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn record(&self, diagnostic: Diagnostic) {
        let code = diagnostic.kind.map(|k| k.code()).unwrap_or("-");
        match diagnostic.severity {
            Severity::Error => tracing::error!(kind = code, "{}", diagnostic.message),
            Severity::Warning => tracing::warn!(kind = code, "{}", diagnostic.message),
            Severity::Note => tracing::info!(kind = code, "{}", diagnostic.message),
        }
        self.records.lock().push(diagnostic);
    }
}

/// Holds the records of one object-reconstruction attempt. On success the
/// records are forwarded to the caller's sink; on escalation they are
/// dropped and the fallback reports the failure once.
#[derive(Debug, Default)]
pub(crate) struct AttemptBuffer {
    records: Mutex<Vec<Diagnostic>>,
}

impl AttemptBuffer {
    pub(crate) fn new() -> Self {
        AttemptBuffer::default()
    }

    pub(crate) fn flush_into(self, sink: &dyn DiagnosticSink) {
        for diagnostic in self.records.into_inner() {
            sink.record(diagnostic);
        }
    }

    pub(crate) fn discard(self) -> usize {
        self.records.into_inner().len()
    }
}

impl DiagnosticSink for AttemptBuffer {
    fn record(&self, diagnostic: Diagnostic) {
        self.records.lock().push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filters_by_severity() {
        let log = DiagnosticLog::new();
        log.record_error("bad".to_string());
        log.record_warning("odd".to_string());
        log.record_note("fyi".to_string());
        assert_eq!(log.len(), 3);
        assert_eq!(log.errors().len(), 1);
        assert_eq!(log.warnings().len(), 1);
        assert_eq!(log.notes().len(), 1);
        assert!(log.has_errors());
    }

    #[test]
    fn test_take_drains() {
        let log = DiagnosticLog::new();
        log.record_failure(&Failure::new(FailureKind::ShapeMismatch, "expected Array"));
        let drained = log.take();
        assert_eq!(drained[0].kind, Some(FailureKind::ShapeMismatch));
        assert!(log.is_empty());
    }

    #[test]
    fn test_attempt_buffer_flush_and_discard() {
        let log = DiagnosticLog::new();
        let buffer = AttemptBuffer::new();
        buffer.record_warning("kept".to_string());
        buffer.flush_into(&log);
        assert_eq!(log.warnings().len(), 1);

        let dropped = AttemptBuffer::new();
        dropped.record_error("lost".to_string());
        assert_eq!(dropped.discard(), 1);
        assert!(!log.has_errors());
    }

    #[test]
    fn test_log_is_shareable_across_threads() {
        let log = std::sync::Arc::new(DiagnosticLog::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let log = log.clone();
                std::thread::spawn(move || log.record_note(format!("thread {}", i)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn test_display_includes_kind() {
        let d = Diagnostic::error(Some(FailureKind::PropertyMissing), "no member `Foo`");
        assert_eq!(d.to_string(), "error [PROPERTY_MISSING]: no member `Foo`");
    }
}
