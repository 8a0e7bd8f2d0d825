use std::fmt;

use serde::Serialize;

use crate::span::{SourceLocation, SourceRange};

/// How serious a diagnostic is.
///
/// Notes never appear on their own; they attach context to the error or
/// warning emitted immediately before them (candidate lists, fix hints).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A single rendered diagnostic: severity, message, one primary location,
/// and zero or more highlighted ranges.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub highlights: Vec<SourceRange>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
            location: None,
            highlights: Vec::new(),
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn highlighting(mut self, range: SourceRange) -> Self {
        // The primary location defaults to the first highlight's start.
        if self.location.is_none() {
            self.location = Some(range.start.clone());
        }
        self.highlights.push(range);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {}: {}", loc, self.severity, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// The append-only diagnostic sink for one compilation.
///
/// Diagnostics are recorded in walk order and never removed; consumers read
/// them back out in that order so error output is deterministic. No
/// diagnostic aborts the pipeline -- the analyzer records and keeps walking.
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn add(&mut self, diag: Diagnostic) {
        self.diagnostics.push(diag);
    }

    /// Record an error with no location.
    pub fn error(&mut self, message: impl Into<String>) {
        self.add(Diagnostic::new(Severity::Error, message));
    }

    /// Record a warning with no location.
    pub fn warning(&mut self, message: impl Into<String>) {
        self.add(Diagnostic::new(Severity::Warning, message));
    }

    /// Record a note attached to the previous diagnostic.
    pub fn note(&mut self, message: impl Into<String>) {
        self.add(Diagnostic::new(Severity::Note, message));
    }

    /// All diagnostics, in emission order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Whether any error-severity diagnostic has been recorded.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Number of error-severity diagnostics.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Number of warning-severity diagnostics.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// Serialize all diagnostics to a JSON array, for editor tooling and
    /// test harnesses.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.diagnostics)
            .expect("diagnostics contain no non-serializable data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SourceLocation;

    #[test]
    fn engine_counts_by_severity() {
        let mut engine = DiagnosticEngine::new();
        engine.error("bad");
        engine.warning("iffy");
        engine.note("context");
        assert!(engine.has_errors());
        assert_eq!(engine.error_count(), 1);
        assert_eq!(engine.warning_count(), 1);
        assert_eq!(engine.diagnostics().len(), 3);
    }

    #[test]
    fn emission_order_is_preserved() {
        let mut engine = DiagnosticEngine::new();
        engine.error("first");
        engine.error("second");
        let messages: Vec<_> = engine
            .diagnostics()
            .iter()
            .map(|d| d.message.as_str())
            .collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn diagnostic_display_includes_location() {
        let diag = Diagnostic::new(Severity::Error, "unknown type `Foo`")
            .at(SourceLocation::new(2, 5, 14).in_file("a.tarn"));
        assert_eq!(diag.to_string(), "a.tarn:2:5: error: unknown type `Foo`");
    }

    #[test]
    fn to_json_round_trips_messages() {
        let mut engine = DiagnosticEngine::new();
        engine.warning("shadowed");
        let json = engine.to_json();
        assert!(json.contains("\"Warning\""));
        assert!(json.contains("shadowed"));
    }
}
