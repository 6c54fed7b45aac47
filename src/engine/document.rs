//! Immutable normalized document handed to every field detector.

use std::borrow::Cow;

use super::normalize::normalize;
use crate::utils::text::head_chars;

/// A normalized document: the full text plus its lines.
///
/// Built once per input and shared read-only by every field. Line indices
/// used throughout the engine are 0-based positions in [`Document::lines`].
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    text: String,
    lines: Vec<String>,
}

impl Document {
    /// Normalize `raw` and split it into lines.
    pub fn new(raw: &str) -> Self {
        Self::from_normalized(normalize(raw))
    }

    /// Wrap text that has already been normalized.
    pub fn from_normalized(text: String) -> Self {
        let lines = if text.is_empty() {
            Vec::new()
        } else {
            text.split('\n').map(str::to_string).collect()
        };
        Self { text, lines }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// The first `max_chars` characters of the document.
    pub fn head(&self, max_chars: usize) -> &str {
        head_chars(&self.text, max_chars)
    }

    /// The document limited to the first `max_chars` characters, borrowed
    /// when it is already short enough.
    ///
    /// Used by fields that enforce a character cap as a guard against
    /// pathological input.
    pub fn truncated(&self, max_chars: usize) -> Cow<'_, Document> {
        let head = self.head(max_chars);
        if head.len() == self.text.len() {
            return Cow::Borrowed(self);
        }
        Cow::Owned(Document::from_normalized(head.to_string()))
    }

    /// Lines in `[start, end)`, clamped to the document.
    pub fn span(&self, start: usize, end: usize) -> &[String] {
        let end = end.min(self.lines.len());
        let start = start.min(end);
        &self.lines[start..end]
    }

    /// Lines in the inclusive window `[index - before, index + after]`.
    pub fn window(&self, index: usize, before: usize, after: usize) -> &[String] {
        self.span(index.saturating_sub(before), index.saturating_add(after).saturating_add(1))
    }

    /// Byte offset of the start of line `index` within [`Document::text`].
    pub fn line_offset(&self, index: usize) -> usize {
        self.lines
            .iter()
            .take(index)
            .map(|line| line.len() + 1)
            .sum::<usize>()
            .min(self.text.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lines_are_normalized() {
        let doc = Document::new("Class\u{00A0}Location:  Room 105\r\nOffice:\tRoom 201");
        assert_eq!(doc.lines(), &["Class Location: Room 105", "Office: Room 201"]);
        assert_eq!(doc.line(1), Some("Office: Room 201"));
        assert_eq!(doc.line(2), None);
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::new("");
        assert!(doc.is_empty());
        assert_eq!(doc.line_count(), 0);
        assert!(doc.window(0, 2, 2).is_empty());
    }

    #[test]
    fn test_window_clamps() {
        let doc = Document::new("a\nb\nc\nd\ne");
        assert_eq!(doc.window(0, 2, 1), &["a", "b"]);
        assert_eq!(doc.window(3, 1, 5), &["c", "d", "e"]);
    }

    #[test]
    fn test_truncated_and_offsets() {
        let doc = Document::new("first line\nsecond line");
        assert_eq!(doc.truncated(5).text(), "first");
        assert!(matches!(doc.truncated(500), Cow::Borrowed(d) if *d == doc));
        assert_eq!(doc.line_offset(1), 11);
        assert_eq!(&doc.text()[doc.line_offset(1)..], "second line");
    }
}
