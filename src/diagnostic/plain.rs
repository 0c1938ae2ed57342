use super::{Diagnostic, Severity};
use crate::ast::SourceMap;

/// Line-oriented output in the style of DVD authoring tools:
/// `ERR:`, `WARN:`, `INFO:` and `STAT:` prefixes, one diagnostic per line
/// followed by indented notes.
pub fn render(d: &Diagnostic) -> String {
    let prefix = match d.severity {
        Severity::Error => "ERR:",
        Severity::Warning => "WARN:",
        Severity::Info => "INFO:",
        Severity::Stat => "STAT:",
    };
    let mut out = format!("{prefix}  ");
    if let Some(code) = d.code {
        out.push_str(&format!("[{code}] "));
    }
    out.push_str(&d.message);
    if let (Some(span), Some(source)) = (d.primary_span(), &d.source) {
        let (line, col) = SourceMap::new(source).start_of(span);
        out.push_str(&format!(" (line {line}, column {col})"));
    }
    out.push('\n');
    for note in &d.notes {
        out.push_str(&format!("      note: {note}\n"));
    }
    if let Some(suggestion) = &d.suggestion {
        out.push_str(&format!("      hint: {suggestion}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    #[test]
    fn error_line_has_prefix_code_and_position() {
        let d = Diagnostic::error("undefined label 'top'")
            .with_code("NAV-C012")
            .with_span(Span { start: 8, end: 17 }, "here")
            .with_source("g0 = 1;\ngoto top;");
        assert_eq!(render(&d), "ERR:  [NAV-C012] undefined label 'top' (line 2, column 1)\n");
    }

    #[test]
    fn prefixes_by_severity() {
        assert!(render(&Diagnostic::warning("w")).starts_with("WARN:  w"));
        assert!(render(&Diagnostic::info("i")).starts_with("INFO:  i"));
        assert!(render(&Diagnostic::stat("3 instructions")).starts_with("STAT:  3 instructions"));
    }

    #[test]
    fn notes_and_hints_are_indented() {
        let d = Diagnostic::error("bad").with_note("n").with_suggestion("s");
        let out = render(&d);
        assert!(out.contains("\n      note: n\n"));
        assert!(out.ends_with("      hint: s\n"));
    }
}
