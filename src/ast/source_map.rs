use super::Span;

/// Line index over a navigation script, for turning byte spans into
/// `line:column` positions.
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        SourceMap { line_starts }
    }

    /// 1-based (line, column) of a byte offset.
    pub fn lookup(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= offset).saturating_sub(1);
        (line + 1, offset - self.line_starts[line] + 1)
    }

    /// Position of the first byte of `span`.
    pub fn start_of(&self, span: Span) -> (usize, usize) {
        self.lookup(span.start)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Text of a 1-based line without its line terminator.
    pub fn line_text<'a>(&self, source: &'a str, line: usize) -> &'a str {
        let Some(&start) = line.checked_sub(1).and_then(|i| self.line_starts.get(i)) else {
            return "";
        };
        let end = self.line_starts.get(line).copied().unwrap_or(source.len());
        source.get(start..end).unwrap_or("").trim_end_matches(['\n', '\r'])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "g1 = 3;\nif (g1 == 3)\n  jump title 2;";

    #[test]
    fn positions() {
        let sm = SourceMap::new(SCRIPT);
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.lookup(5), (1, 6));
        assert_eq!(sm.lookup(7), (1, 8));
        assert_eq!(sm.lookup(8), (2, 1));
        assert_eq!(sm.start_of(Span { start: 23, end: 27 }), (3, 3));
    }

    #[test]
    fn lines() {
        let sm = SourceMap::new(SCRIPT);
        assert_eq!(sm.line_count(), 3);
        assert_eq!(sm.line_text(SCRIPT, 1), "g1 = 3;");
        assert_eq!(sm.line_text(SCRIPT, 3), "  jump title 2;");
        assert_eq!(sm.line_text(SCRIPT, 0), "");
        assert_eq!(sm.line_text(SCRIPT, 4), "");
    }

    #[test]
    fn crlf_and_empty() {
        let src = "exit;\r\n";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_text(src, 1), "exit;");
        assert_eq!(sm.line_text(src, 2), "");
        assert_eq!(SourceMap::new("").lookup(0), (1, 1));
    }
}
