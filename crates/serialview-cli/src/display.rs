//! Terminal rendering of refresh ticks

use serialview_core::highlight::{HighlightKind, HighlightSpan, KeywordHighlighter};
use serialview_core::refresh::DisplaySink;
use std::io::{self, Write};

const RESET: &str = "\x1b[0m";
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

fn colour(kind: HighlightKind) -> &'static str {
    match kind {
        HighlightKind::Info => "\x1b[32m",
        HighlightKind::Warning => "\x1b[33m",
        HighlightKind::Error => "\x1b[31m",
        HighlightKind::SysInfo => "\x1b[36m",
        HighlightKind::Timestamp => "\x1b[90m",
    }
}

/// Wrap each span in ANSI colour codes. Overlapping spans keep the first.
pub fn colourize(text: &str, spans: &[HighlightSpan]) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * 10);
    let mut cursor = 0;
    for span in spans {
        if span.range.start < cursor {
            continue;
        }
        out.push_str(&text[cursor..span.range.start]);
        out.push_str(colour(span.kind));
        out.push_str(&text[span.range.clone()]);
        out.push_str(RESET);
        cursor = span.range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Writes display text straight to stdout
///
/// Each refresh batch is highlighted on its own, so a keyword or timestamp
/// marker split across two batches is left uncoloured.
pub struct StdoutDisplay {
    highlighter: Option<KeywordHighlighter>,
}

impl StdoutDisplay {
    pub fn new(highlighter: Option<KeywordHighlighter>) -> Self {
        Self { highlighter }
    }

    fn write(&self, text: &str) {
        let mut out = io::stdout().lock();
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "failed to write to stdout");
        }
    }
}

impl DisplaySink for StdoutDisplay {
    fn append(&mut self, text: &str) {
        match &self.highlighter {
            Some(h) => self.write(&colourize(text, &h.highlight(text))),
            None => self.write(text),
        }
    }

    // A terminal always shows the tail
    fn scroll_to_bottom(&mut self) {}

    fn clear(&mut self) {
        self.write(CLEAR_SCREEN);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_colourize_keywords() {
        let h = KeywordHighlighter::new().unwrap();
        let text = "boot ok\nERROR: sensor\n";
        assert_eq!(
            colourize(text, &h.highlight(text)),
            "boot ok\n\x1b[31mERROR\x1b[0m: sensor\n"
        );
    }

    #[test]
    fn test_keyword_split_across_batches_stays_plain() {
        let h = KeywordHighlighter::new().unwrap();
        let first = "boot ERR";
        let second = "OR\n";
        assert_eq!(colourize(first, &h.highlight(first)), first);
        assert_eq!(colourize(second, &h.highlight(second)), second);
    }

    #[test]
    fn test_colourize_without_spans() {
        assert_eq!(colourize("plain", &[]), "plain");
    }

    #[test]
    fn test_overlapping_span_skipped() {
        let spans = vec![
            HighlightSpan {
                range: 0..4,
                kind: HighlightKind::Info,
            },
            HighlightSpan {
                range: 2..6,
                kind: HighlightKind::Error,
            },
        ];
        assert_eq!(colourize("info x", &spans), "\x1b[32minfo\x1b[0m x");
    }
}
