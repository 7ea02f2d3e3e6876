//! Diagnostic reporting for boxql.
//!
//! Parse errors and validation findings are both reported as [`Diagnostic`]s.
//! A diagnostic carries one [`Label`] per offending source node so callers can
//! highlight every node involved (both sides of a field conflict, for example).

use crate::span::Span;

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    /// An error that invalidates the document.
    Error,
    /// A warning that doesn't invalidate the document.
    Warning,
}

/// A label attached to a diagnostic.
#[derive(Debug, Clone)]
pub struct Label {
    /// The span this label points to.
    pub span: Span,
    /// The label message.
    pub message: String,
}

impl Label {
    /// Creates a new label.
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

/// A diagnostic message.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level.
    pub severity: DiagnosticSeverity,
    /// Error code.
    pub code: &'static str,
    /// Human-readable message.
    pub title: String,
    /// Optional longer explanation.
    pub message: Option<String>,
    /// Labels pointing to source locations.
    pub labels: Vec<Label>,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    pub fn error(code: &'static str, title: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            code,
            title: title.into(),
            message: None,
            labels: Vec::new(),
        }
    }

    /// Creates a new warning diagnostic.
    pub fn warning(code: &'static str, title: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            ..Self::error(code, title)
        }
    }

    /// Adds a message to the diagnostic.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a label at a span.
    #[must_use]
    pub fn with_span(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label::new(span, message));
        self
    }

    /// Adds an unlabelled span for every node in `spans`.
    #[must_use]
    pub fn with_spans(mut self, spans: impl IntoIterator<Item = Span>) -> Self {
        self.labels
            .extend(spans.into_iter().map(|span| Label::new(span, String::new())));
        self
    }

    /// Returns the primary span, if any.
    pub fn primary_span(&self) -> Option<Span> {
        self.labels.first().map(|l| l.span)
    }

    /// Returns every labelled span in insertion order.
    pub fn spans(&self) -> impl Iterator<Item = Span> + '_ {
        self.labels.iter().map(|l| l.span)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// An ordered, append-only collection of diagnostics.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    /// Creates a new empty diagnostic bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Adds an error diagnostic with a single labelled span.
    pub fn error(
        &mut self,
        code: &'static str,
        title: impl Into<String>,
        span: Span,
        message: impl Into<String>,
    ) {
        self.add(Diagnostic::error(code, title).with_span(span, message));
    }

    /// Returns true if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Returns an iterator over all diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Returns an iterator over errors.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
    }

    /// Returns true if there are no diagnostics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns the number of diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Moves the diagnostics out.
    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl IntoIterator for DiagnosticBag {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

/// Diagnostic codes.
pub mod codes {
    pub const UNEXPECTED_TOKEN: &str = "E0001";
    pub const INVALID_SYNTAX: &str = "E0003";
    pub const UNDEFINED_TYPE: &str = "E0010";
    pub const UNDEFINED_FIELD: &str = "E0011";
    pub const UNDEFINED_ARGUMENT: &str = "E0014";
    pub const MISSING_ARGUMENT: &str = "E0015";
    pub const UNDEFINED_VARIABLE: &str = "E0016";
    pub const SELECTION_MISMATCH: &str = "E0021";
    pub const UNDEFINED_DIRECTIVE: &str = "E0030";
    pub const UNDEFINED_FRAGMENT: &str = "E0040";
    pub const UNUSED_FRAGMENT: &str = "E0041";
    pub const FRAGMENT_CYCLE: &str = "E0042";
    pub const FIELD_CONFLICT: &str = "E0050";
    pub const ARGUMENT_CONFLICT: &str = "E0051";
    pub const QUERY_TOO_DEEP: &str = "E0060";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bag_preserves_insertion_order() {
        let mut bag = DiagnosticBag::new();
        bag.error(codes::FIELD_CONFLICT, "first", Span::new(0, 1), "");
        bag.add(Diagnostic::warning(codes::UNUSED_FRAGMENT, "second"));
        bag.error(codes::ARGUMENT_CONFLICT, "third", Span::new(2, 3), "");

        let titles: Vec<_> = bag.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
        assert_eq!(bag.error_count(), 2);
    }

    #[test]
    fn test_with_spans_labels_every_node() {
        let diag = Diagnostic::error(codes::FIELD_CONFLICT, "conflict")
            .with_spans([Span::new(0, 3), Span::new(10, 13)]);

        assert_eq!(diag.primary_span(), Some(Span::new(0, 3)));
        assert_eq!(diag.spans().count(), 2);
        assert_eq!(diag.to_string(), "conflict");
    }
}
