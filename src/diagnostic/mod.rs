pub mod ansi;
pub mod json;
pub mod plain;
pub mod registry;

use crate::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
    /// Summary statistics, such as the size of a compiled block.
    Stat,
}

impl Severity {
    pub fn name(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Stat => "stat",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Info, message)
    }

    pub fn stat(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Stat, message)
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        if span != Span::UNKNOWN {
            self.labels.push(Label { span, message: label.into(), is_primary: true });
        }
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn primary_span(&self) -> Option<Span> {
        self.labels.iter().find(|l| l.is_primary).map(|l| l.span)
    }
}

// ---- From impls for existing error types ----

impl From<&crate::lexer::LexError> for Diagnostic {
    fn from(e: &crate::lexer::LexError) -> Self {
        let span = Span::from(e.span.clone());
        let mut d = Diagnostic::error(format!("unexpected input '{}'", e.snippet))
            .with_code("NAV-L001")
            .with_span(span, "here");
        if !e.suggestion.is_empty() {
            d = d.with_suggestion(e.suggestion.clone());
        }
        d
    }
}

impl From<&crate::parser::ParseError> for Diagnostic {
    fn from(e: &crate::parser::ParseError) -> Self {
        Diagnostic::error(&e.message).with_code(e.code).with_span(e.span, "here")
    }
}

impl From<&crate::compiler::CompileError> for Diagnostic {
    fn from(e: &crate::compiler::CompileError) -> Self {
        let mut d = Diagnostic::error(e.kind.to_string())
            .with_code(e.kind.code())
            .with_span(e.span, "in this statement");
        if let Some(hint) = e.kind.hint() {
            d = d.with_suggestion(hint);
        }
        d
    }
}

impl From<&crate::pgc::TableError> for Diagnostic {
    fn from(e: &crate::pgc::TableError) -> Self {
        let d = Diagnostic::error(e.to_string());
        match e {
            crate::pgc::TableError::TooManyCommands { .. } => d.with_code("NAV-C013"),
            _ => d,
        }
    }
}

impl From<&crate::vm::VmError> for Diagnostic {
    fn from(e: &crate::vm::VmError) -> Self {
        Diagnostic::error(e.to_string()).with_code("NAV-R001")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    #[test]
    fn diagnostic_error_builder() {
        let d = Diagnostic::error("something went wrong");
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "something went wrong");
        assert!(d.code.is_none());
        assert!(d.labels.is_empty());
        assert!(d.suggestion.is_none());
    }

    #[test]
    fn unknown_span_adds_no_label() {
        let d = Diagnostic::warning("note").with_span(Span::UNKNOWN, "here");
        assert!(d.labels.is_empty());
        assert_eq!(d.primary_span(), None);
    }

    #[test]
    fn from_lex_error() {
        let e = crate::lexer::LexError {
            position: 3,
            span: 3..4,
            snippet: "$".to_string(),
            suggestion: "Unexpected character(s): '$'.".to_string(),
        };
        let d = Diagnostic::from(&e);
        assert_eq!(d.code, Some("NAV-L001"));
        assert_eq!(d.primary_span(), Some(Span { start: 3, end: 4 }));
        assert!(d.suggestion.is_some());
    }

    #[test]
    fn from_parse_error() {
        let e = crate::parser::ParseError {
            code: "NAV-P007",
            position: 0,
            span: Span { start: 0, end: 3 },
            message: "unknown register 'g16'".to_string(),
        };
        let d = Diagnostic::from(&e);
        assert_eq!(d.code, Some("NAV-P007"));
        assert!(d.message.contains("g16"));
    }

    #[test]
    fn from_compile_error() {
        let e = crate::compiler::CompileError {
            kind: crate::compiler::ErrorKind::UndefinedLabel("top".into()),
            span: Span { start: 4, end: 14 },
        };
        let d = Diagnostic::from(&e);
        assert_eq!(d.code, Some("NAV-C012"));
        assert!(d.message.contains("'top'"));
        assert_eq!(d.primary_span(), Some(Span { start: 4, end: 14 }));
    }
}
