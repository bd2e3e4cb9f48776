//! Umbra error handling - unified encapsulated API
//!
//! Every failure mode in the pipeline (parse, rewrite, I/O) is represented by
//! the single `UmbraError` struct, rendered through miette for rich CLI
//! diagnostics.

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use thiserror::Error;

use crate::syntax::Pos;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Source context for error reporting, with explicit hierarchy between real
/// sources (preferred) and fallbacks (tolerated when necessary).
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from real file content.
    /// This is the preferred constructor for error reporting.
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a fallback when real source is unavailable.
    pub fn fallback(context: &str) -> Self {
        Self {
            name: "fallback".to_string(),
            content: format!("// {}", context),
        }
    }

    /// Convert to NamedSource for use with miette error reporting.
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }

    /// Byte offset of a 1-based line/column position in this source.
    ///
    /// Positions past the end of the content clamp to the final byte, so a
    /// stale `Pos` still yields a presentable span.
    pub fn offset_of(&self, pos: Pos) -> usize {
        let mut line = 1usize;
        for (i, ch) in self.content.char_indices() {
            if line == pos.line {
                return (i + pos.column.saturating_sub(1)).min(self.content.len());
            }
            if ch == '\n' {
                line += 1;
            }
        }
        self.content.len()
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("default context")
    }
}

// ============================================================================
// ERROR TYPE
// ============================================================================

/// The single error type - no wrapper, no nesting, just essential data.
#[derive(Debug)]
pub struct UmbraError {
    /// What went wrong (type-specific data)
    pub kind: ErrorKind,
    /// Where it happened (context-specific source information)
    pub source_info: SourceInfo,
    /// How to help (auto-populated based on context)
    pub diagnostic_info: DiagnosticInfo,
}

/// All error kinds as a clean enum - no duplicate fields.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // Parse errors - structural and syntactic issues
    #[error("Parse error: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("Parse error: malformed {construct}")]
    MalformedConstruct { construct: String },
    #[error("Parse error: invalid {literal_type} '{value}'")]
    InvalidLiteral { literal_type: String, value: String },

    // Rewrite errors - instrumentation failures
    #[error("Rewrite error: cannot derive a shadow name for {construct}")]
    MissingIdentifier { construct: String },
    #[error("Rewrite error: {message}")]
    InvariantViolation { message: String },

    // Environment errors - file and stream handling in the CLI
    #[error("I/O error: {message}")]
    Io { message: String },
}

/// Context-specific source information.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub phase: String,
}

/// Diagnostic enhancement data.
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

impl ErrorKind {
    /// Get the error category for test assertions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnexpectedToken { .. }
            | Self::MalformedConstruct { .. }
            | Self::InvalidLiteral { .. } => ErrorCategory::Parse,

            Self::MissingIdentifier { .. } | Self::InvariantViolation { .. } => {
                ErrorCategory::Rewrite
            }

            Self::Io { .. } => ErrorCategory::Environment,
        }
    }

    /// Error code suffix for diagnostic codes.
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::UnexpectedToken { .. } => "unexpected_token",
            Self::MalformedConstruct { .. } => "malformed_construct",
            Self::InvalidLiteral { .. } => "invalid_literal",
            Self::MissingIdentifier { .. } => "missing_identifier",
            Self::InvariantViolation { .. } => "invariant_violation",
            Self::Io { .. } => "io",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Rewrite,
    Environment,
}

impl std::error::Error for UmbraError {}

impl fmt::Display for UmbraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Diagnostic for UmbraError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.primary_label()),
            self.source_info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

impl UmbraError {
    fn primary_label(&self) -> String {
        match &self.kind {
            ErrorKind::UnexpectedToken { .. } => "unexpected token".into(),
            ErrorKind::MalformedConstruct { .. } => "malformed syntax".into(),
            ErrorKind::InvalidLiteral { .. } => "invalid literal".into(),
            ErrorKind::MissingIdentifier { .. } => "no identifier to shadow".into(),
            ErrorKind::InvariantViolation { .. } => "invariant violated here".into(),
            ErrorKind::Io { .. } => "while handling this input".into(),
        }
    }
}

// ============================================================================
// ERROR REPORTING CONTEXTS
// ============================================================================

/// Context-aware error creation - each pipeline phase knows how to create
/// appropriately coded errors.
pub trait ErrorReporting {
    /// Create an error with context-appropriate enhancements.
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> UmbraError;

    fn unexpected_token(&self, expected: &str, found: &str, span: SourceSpan) -> UmbraError {
        self.report(
            ErrorKind::UnexpectedToken {
                expected: expected.into(),
                found: found.into(),
            },
            span,
        )
    }

    fn malformed_construct(&self, construct: &str, span: SourceSpan) -> UmbraError {
        self.report(
            ErrorKind::MalformedConstruct {
                construct: construct.into(),
            },
            span,
        )
    }

    fn invalid_literal(&self, literal_type: &str, value: &str, span: SourceSpan) -> UmbraError {
        self.report(
            ErrorKind::InvalidLiteral {
                literal_type: literal_type.into(),
                value: value.into(),
            },
            span,
        )
    }

    fn missing_identifier(&self, construct: &str, span: SourceSpan) -> UmbraError {
        self.report(
            ErrorKind::MissingIdentifier {
                construct: construct.into(),
            },
            span,
        )
    }

    /// Creates an internal invariant error - these indicate engine bugs, not
    /// user errors.
    fn invariant_violation(&self, message: &str, span: SourceSpan) -> UmbraError {
        let mut error = self.report(
            ErrorKind::InvariantViolation {
                message: message.into(),
            },
            span,
        );
        error.diagnostic_info.help =
            Some("This is an internal engine error. Please report this as a bug.".into());
        error
    }
}

/// General-purpose error creation context used by the parser and the rewrite
/// engine for creating properly contextualized `UmbraError` instances.
pub struct PhaseContext {
    pub source: SourceContext,
    pub phase: String,
}

impl PhaseContext {
    pub fn new(source: SourceContext, phase: impl Into<String>) -> Self {
        Self {
            source,
            phase: phase.into(),
        }
    }

    /// Span covering a single node position.
    pub fn span_at(&self, pos: Pos) -> SourceSpan {
        let len = self.source.content.len();
        let start = self.source.offset_of(pos).min(len);
        let end = (start + 1).min(len).max(start);
        SourceSpan::from(start..end)
    }
}

impl ErrorReporting for PhaseContext {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> UmbraError {
        let error_code = format!("umbra::{}::{}", self.phase, kind.code_suffix());

        UmbraError {
            kind,
            source_info: SourceInfo {
                source: self.source.to_named_source(),
                primary_span: span,
                phase: self.phase.clone(),
            },
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code,
            },
        }
    }
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// A placeholder span for errors not tied to a specific source location, such
/// as I/O errors or internal application state failures.
pub fn unspanned() -> SourceSpan {
    SourceSpan::from(0..0)
}

/// Constructs an I/O error outside any source context (file unreadable,
/// stream closed, and similar CLI-level failures).
pub fn io_error(message: impl Into<String>) -> UmbraError {
    let message = message.into();
    UmbraError {
        kind: ErrorKind::Io {
            message: message.clone(),
        },
        source_info: SourceInfo {
            source: SourceContext::fallback(&message).to_named_source(),
            primary_span: unspanned(),
            phase: "cli".into(),
        },
        diagnostic_info: DiagnosticInfo {
            help: None,
            error_code: "umbra::cli::io".into(),
        },
    }
}

/// Prints an `UmbraError` with full miette diagnostics.
///
/// Use this for user-facing error display in CLI contexts.
pub fn print_error(error: UmbraError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_context_codes_errors_by_phase() {
        let ctx = PhaseContext::new(SourceContext::from_file("test.js", "let a = 2;"), "parse");
        let err = ctx.unexpected_token(";", "}", unspanned());
        assert_eq!(
            err.diagnostic_info.error_code,
            "umbra::parse::unexpected_token"
        );
        assert_eq!(err.kind.category(), ErrorCategory::Parse);
    }

    #[test]
    fn offset_of_resolves_lines_and_columns() {
        let src = SourceContext::from_file("t.js", "let a = 2;\na = 3;\n");
        assert_eq!(src.offset_of(Pos { line: 1, column: 1 }), 0);
        assert_eq!(src.offset_of(Pos { line: 2, column: 1 }), 11);
        assert_eq!(src.offset_of(Pos { line: 2, column: 3 }), 13);
    }

    #[test]
    fn missing_identifier_renders_with_label() {
        let ctx = PhaseContext::new(
            SourceContext::from_file("t.js", "let [a, b] = f();"),
            "rewrite",
        );
        let err = ctx.missing_identifier("destructuring declaration", unspanned());
        let report = miette::Report::new(err);
        let output = format!("{report:?}");
        assert!(output.contains("cannot derive a shadow name"));
    }
}
