//! Text normalization and line bookkeeping.

use std::ops::Range;

/// Whitespace-normalized text with a line index.
///
/// Carriage returns are removed, runs of spaces/tabs collapse to one space
/// and every line is trimmed. Line structure is preserved so candidates can
/// be located by line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    text: String,
    line_starts: Vec<usize>,
}

impl NormalizedText {
    pub fn new(raw: &str) -> Self {
        let raw = raw.replace("\r\n", "\n").replace('\r', "\n");
        let text = raw
            .split('\n')
            .map(collapse_whitespace)
            .collect::<Vec<_>>()
            .join("\n");

        let mut line_starts = vec![0];
        line_starts.extend(
            text.char_indices()
                .filter(|(_, c)| *c == '\n')
                .map(|(i, _)| i + 1),
        );

        Self { text, line_starts }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Zero-based line containing byte `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    /// Byte range of `line`, without the newline.
    pub fn line_span(&self, line: usize) -> Range<usize> {
        let start = self.line_starts[line];
        let end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        start..end
    }

    pub fn line(&self, line: usize) -> &str {
        &self.text[self.line_span(line)]
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        (0..self.line_count()).map(|i| self.line(i))
    }

    /// Byte offset `chars` characters after `start`, capped at the end.
    pub fn advance_chars(&self, start: usize, chars: usize) -> usize {
        self.text[start..]
            .char_indices()
            .nth(chars)
            .map(|(i, _)| start + i)
            .unwrap_or(self.text.len())
    }
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Single-line evidence snippet truncated to `max_chars`.
pub fn snippet(s: &str, max_chars: usize) -> String {
    let collapsed = collapse_whitespace(s);
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        collapsed.chars().take(max_chars).collect()
    }
}
