//! Keyword classification for display colouring
//!
//! The collaborator owns colours; this module only says which ranges of a line
//! are keywords or timestamp markers.

use regex::{Regex, RegexBuilder};
use std::ops::Range;

/// What a highlighted span is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HighlightKind {
    /// The word `info`
    Info,
    /// The word `warning`
    Warning,
    /// The word `error`
    Error,
    /// The word `sysinfo`
    SysInfo,
    /// A `HH:MM:SS.mmm >>` prefix
    Timestamp,
}

/// A classified byte range of the input text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    /// Byte offsets into the text
    pub range: Range<usize>,
    /// What the span matched
    pub kind: HighlightKind,
}

/// Finds keywords and timestamp markers in display text
pub struct KeywordHighlighter {
    rules: Vec<(Regex, HighlightKind)>,
    enabled: bool,
}

fn keyword(word: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&format!(r"\b{word}\b"))
        .case_insensitive(true)
        .build()
}

impl KeywordHighlighter {
    /// Highlighter with the built-in rules, enabled
    pub fn new() -> Result<Self, regex::Error> {
        let rules = vec![
            (keyword("info")?, HighlightKind::Info),
            (keyword("warning")?, HighlightKind::Warning),
            (keyword("error")?, HighlightKind::Error),
            (keyword("sysinfo")?, HighlightKind::SysInfo),
            (
                Regex::new(r"\d{2}:\d{2}:\d{2}\.\d{3}\s*>>")?,
                HighlightKind::Timestamp,
            ),
        ];
        Ok(Self {
            rules,
            enabled: true,
        })
    }

    /// Turn highlighting on or off
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether highlighting is on
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Spans sorted by start offset; empty when disabled
    pub fn highlight(&self, text: &str) -> Vec<HighlightSpan> {
        if !self.enabled {
            return Vec::new();
        }

        let mut spans: Vec<HighlightSpan> = self
            .rules
            .iter()
            .flat_map(|(re, kind)| {
                re.find_iter(text).map(move |m| HighlightSpan {
                    range: m.range(),
                    kind: *kind,
                })
            })
            .collect();
        spans.sort_by_key(|s| (s.range.start, s.range.end));
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_case_insensitive() {
        let hl = KeywordHighlighter::new().unwrap();
        let spans = hl.highlight("WARNING: sensor info lost, Error 3");
        let kinds: Vec<_> = spans.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![HighlightKind::Warning, HighlightKind::Info, HighlightKind::Error]
        );
        assert_eq!(spans[0].range, 0..7);
    }

    #[test]
    fn test_whole_words_only() {
        let hl = KeywordHighlighter::new().unwrap();
        assert!(hl.highlight("information errors").is_empty());
    }

    #[test]
    fn test_timestamp_marker() {
        let hl = KeywordHighlighter::new().unwrap();
        let spans = hl.highlight("12:00:01.250 >> 48 65");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, HighlightKind::Timestamp);
        assert_eq!(spans[0].range, 0..15);
    }

    #[test]
    fn test_disabled() {
        let mut hl = KeywordHighlighter::new().unwrap();
        hl.set_enabled(false);
        assert!(hl.highlight("error").is_empty());
    }
}
