use serde::Serialize;

use super::Diagnostic;
use crate::ast::SourceMap;

#[derive(Serialize)]
struct JsonLabel<'a> {
    start: usize,
    end: usize,
    message: &'a str,
    primary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    col: Option<usize>,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    severity: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    message: &'a str,
    labels: Vec<JsonLabel<'a>>,
    notes: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'a str>,
}

/// One JSON object per diagnostic, on a single line.
pub fn render(d: &Diagnostic) -> String {
    let map = d.source.as_deref().map(SourceMap::new);
    let labels = d
        .labels
        .iter()
        .map(|l| {
            let position = map.as_ref().map(|m| m.start_of(l.span));
            JsonLabel {
                start: l.span.start,
                end: l.span.end,
                message: &l.message,
                primary: l.is_primary,
                line: position.map(|(line, _)| line),
                col: position.map(|(_, col)| col),
            }
        })
        .collect();
    let out = JsonDiagnostic {
        severity: d.severity.name(),
        code: d.code,
        message: &d.message,
        labels,
        notes: &d.notes,
        suggestion: d.suggestion.as_deref(),
    };
    serde_json::to_string(&out)
        .unwrap_or_else(|e| format!(r#"{{"severity":"error","message":"cannot serialize diagnostic: {e}"}}"#))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn rendered(d: &Diagnostic) -> serde_json::Value {
        serde_json::from_str(&render(d)).unwrap()
    }

    #[test]
    fn compile_error_with_position() {
        let d = Diagnostic::error("cannot set SPRM 4")
            .with_code("NAV-C002")
            .with_span(Span { start: 8, end: 15 }, "in this statement")
            .with_source("g0 = 1;\ns4 = 2;");
        let v = rendered(&d);
        assert_eq!(v["severity"], "error");
        assert_eq!(v["code"], "NAV-C002");
        assert_eq!(v["labels"][0]["start"], 8);
        assert_eq!(v["labels"][0]["primary"], true);
        assert_eq!((v["labels"][0]["line"].as_u64(), v["labels"][0]["col"].as_u64()), (Some(2), Some(1)));
    }

    #[test]
    fn absent_fields_are_omitted() {
        let v = rendered(&Diagnostic::stat("2 of 128 instructions used"));
        assert_eq!(v["severity"], "stat");
        assert!(v.get("code").is_none() && v.get("suggestion").is_none());
        assert_eq!(v["labels"], serde_json::json!([]));
    }

    #[test]
    fn no_position_without_source() {
        let d = Diagnostic::warning("Button value should be a multiple of 1024")
            .with_span(Span { start: 5, end: 8 }, "here")
            .with_suggestion("button 1 is written as 1024");
        let v = rendered(&d);
        assert!(v["labels"][0].get("line").is_none());
        assert_eq!(v["suggestion"], "button 1 is written as 1024");
    }

    #[test]
    fn single_line() {
        let d = Diagnostic::error("a").with_note("b").with_note("c");
        assert!(!render(&d).contains('\n'));
    }
}
