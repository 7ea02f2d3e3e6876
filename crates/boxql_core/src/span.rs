//! Source spans and line/column locations.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A span in source code, represented as byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: u32,
    /// End byte offset (exclusive).
    pub end: u32,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Returns the length of this span in bytes.
    #[must_use]
    #[inline]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Returns true if this span is empty.
    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns a span that covers both spans.
    #[must_use]
    #[inline]
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl From<Span> for std::ops::Range<usize> {
    fn from(span: Span) -> Self {
        span.start as usize..span.end as usize
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        miette::SourceSpan::new(
            miette::SourceOffset::from(span.start as usize),
            span.len() as usize,
        )
    }
}

/// A 1-based line/column position, as reported in GraphQL error `locations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// Byte offsets of every line start in a source text.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    /// Indexes the line starts of `source`.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset as u32 + 1);
            }
        }
        Self { line_starts }
    }

    /// Converts a byte offset into a line/column location.
    #[must_use]
    pub fn location(&self, offset: u32) -> SourceLocation {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        SourceLocation {
            line: line as u32 + 1,
            column: offset - self.line_starts[line] + 1,
        }
    }

    /// Location of the start of a span.
    #[must_use]
    pub fn span_start(&self, span: Span) -> SourceLocation {
        self.location(span.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let merged = Span::new(10, 20).merge(Span::new(15, 30));
        assert_eq!(merged, Span::new(10, 30));
        assert_eq!(merged.len(), 20);
    }

    #[test]
    fn test_line_index_first_line() {
        let index = LineIndex::new("{ hello }");
        assert_eq!(index.location(2), SourceLocation { line: 1, column: 3 });
    }

    #[test]
    fn test_line_index_multiline() {
        let source = "query {\n  a\n  b\n}";
        let index = LineIndex::new(source);
        let b_offset = source.find('b').unwrap() as u32;
        assert_eq!(index.location(b_offset), SourceLocation { line: 3, column: 3 });
        assert_eq!(index.location(8), SourceLocation { line: 2, column: 1 });
    }
}
