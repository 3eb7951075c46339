//! Byte ranges over line and document text.

use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted range {start}..{end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Same range moved `delta` bytes to the right.
    pub fn shifted(&self, delta: usize) -> Self {
        Self::new(self.start + delta, self.end + delta)
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn contains_range(&self, other: &TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Slice of `text` covered by this range.
    pub fn substring<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// Shrinks the range so it neither starts nor ends with whitespace.
    pub fn trimmed(&self, text: &str) -> Self {
        let slice = self.substring(text);
        let leading = slice.len() - slice.trim_start().len();
        let trailing = slice.len() - slice.trim_end().len();
        if leading == slice.len() {
            return Self::new(self.start, self.start);
        }
        Self::new(self.start + leading, self.end - trailing)
    }
}

impl std::fmt::Display for TextRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed() {
        let text = "  abc  ";
        let range = TextRange::new(0, text.len()).trimmed(text);
        assert_eq!(range, TextRange::new(2, 5));
        assert_eq!(range.substring(text), "abc");
    }

    #[test]
    fn test_trimmed_all_whitespace() {
        let text = "x    y";
        let range = TextRange::new(1, 5).trimmed(text);
        assert!(range.is_empty());
    }

    #[test]
    fn test_shifted_and_contains() {
        let range = TextRange::new(2, 4).shifted(10);
        assert_eq!(range, TextRange::new(12, 14));
        assert!(range.contains(12));
        assert!(!range.contains(14));
        assert!(TextRange::new(0, 20).contains_range(&range));
    }
}
