use super::{Diagnostic, Label, Severity};
use crate::ast::SourceMap;

#[derive(Clone, Copy)]
enum Style {
    Bold,
    Error,
    Accent,
    Faint,
}

impl Style {
    fn code(self) -> &'static str {
        match self {
            Style::Bold => "1",
            Style::Error => "1;31",
            Style::Accent => "36",
            Style::Faint => "2",
        }
    }
}

/// Compiler-style output: a header line, then the offending source line
/// with carets under the primary span.
pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn paint(&self, style: Style, text: &str) -> String {
        if self.use_color {
            format!("\x1b[{}m{text}\x1b[0m", style.code())
        } else {
            text.to_string()
        }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = self.header(d);
        let primary = d.labels.iter().find(|l| l.is_primary);
        if let (Some(label), Some(source)) = (primary, d.source.as_deref()) {
            out.push_str(&self.snippet(label, source));
        }
        let trailer = d
            .labels
            .iter()
            .filter(|l| !l.is_primary && !l.message.is_empty())
            .map(|l| l.message.clone())
            .chain(d.notes.iter().map(|n| format!("note: {n}")))
            .chain(d.suggestion.iter().map(|s| format!("suggestion: {s}")));
        for line in trailer {
            out.push_str(&format!("  {} {line}\n", self.paint(Style::Faint, "=")));
        }
        out
    }

    /// `error[NAV-C004]: message`
    fn header(&self, d: &Diagnostic) -> String {
        let name = match d.code {
            Some(code) => format!("{}[{code}]", d.severity.name()),
            None => d.severity.name().to_string(),
        };
        let style = match d.severity {
            Severity::Error => Style::Error,
            Severity::Warning => Style::Accent,
            Severity::Info | Severity::Stat => Style::Faint,
        };
        format!("{}: {}\n", self.paint(style, &name), self.paint(Style::Bold, &d.message))
    }

    fn snippet(&self, label: &Label, source: &str) -> String {
        let map = SourceMap::new(source);
        let (line, col) = map.start_of(label.span);
        let text = map.line_text(source, line);
        let width = line.to_string().len();
        let bar = self.paint(Style::Accent, "|");
        let blank = format!("{} {bar}\n", " ".repeat(width));

        // Carets stop at the end of the line for spans covering several.
        let room = text.len().saturating_sub(col - 1).max(1);
        let len = label.span.end.saturating_sub(label.span.start).clamp(1, room);
        let mut marker = format!("{}{}", " ".repeat(col - 1), self.paint(Style::Error, &"^".repeat(len)));
        if !label.message.is_empty() {
            marker.push(' ');
            marker.push_str(&self.paint(Style::Error, &label.message));
        }

        let mut out = format!("  {} {line}:{col}\n", self.paint(Style::Accent, "-->"));
        out.push_str(&blank);
        out.push_str(&format!("{} {bar} {text}\n", self.paint(Style::Accent, &format!("{line:>width$}"))));
        out.push_str(&format!("{} {bar} {marker}\n", " ".repeat(width)));
        out.push_str(&blank);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    const SCRIPT: &str = "g0 = 1;\nif (g0 == 1) goto done;\nexit;";

    fn undefined_label() -> Diagnostic {
        Diagnostic::error("undefined label 'done'")
            .with_code("NAV-C012")
            .with_span(Span { start: 21, end: 31 }, "in this statement")
            .with_source(SCRIPT)
            .with_note("labels are matched without regard to case")
            .with_suggestion("add 'done:' before the statement to jump to")
    }

    fn uncolored(d: &Diagnostic) -> String {
        AnsiRenderer { use_color: false }.render(d)
    }

    #[test]
    fn header_names_the_code() {
        let out = uncolored(&undefined_label());
        assert!(out.starts_with("error[NAV-C012]: undefined label 'done'\n"), "got:\n{out}");
    }

    #[test]
    fn carets_under_the_statement() {
        let out = uncolored(&undefined_label());
        assert!(out.contains("--> 2:14"), "got:\n{out}");
        assert!(out.contains("2 | if (g0 == 1) goto done;"), "got:\n{out}");
        assert!(out.contains(&format!("  | {}{} in this statement", " ".repeat(13), "^".repeat(10))), "got:\n{out}");
    }

    #[test]
    fn carets_stop_at_line_end() {
        let d = Diagnostic::error("x").with_span(Span { start: 0, end: 30 }, "").with_source(SCRIPT);
        let out = uncolored(&d);
        assert!(out.contains(&format!("| {}\n", "^".repeat(7))), "got:\n{out}");
    }

    #[test]
    fn trailer_lines() {
        let out = uncolored(&undefined_label());
        assert!(out.contains("= note: labels are matched"), "got:\n{out}");
        assert!(out.contains("= suggestion: add 'done:'"), "got:\n{out}");
    }

    #[test]
    fn without_source_only_the_header() {
        let out = uncolored(&Diagnostic::warning("Button value should be a multiple of 1024"));
        assert_eq!(out, "warning: Button value should be a multiple of 1024\n");
    }

    #[test]
    fn escapes_only_with_color() {
        let d = undefined_label();
        assert!(AnsiRenderer { use_color: true }.render(&d).contains("\x1b[1;31m"));
        assert!(!uncolored(&d).contains('\x1b'));
    }
}
