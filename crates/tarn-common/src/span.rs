use std::cmp::Ordering;

use serde::Serialize;

/// A position in a source file.
///
/// All positions in the Tarn compiler carry both a human-readable
/// (line, column) pair and the absolute byte offset into the source text.
/// The offset is authoritative for ordering; line/column exist for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// The file this location belongs to. `None` for synthesized nodes,
    /// `"<stdin>"` is used as a pseudo-path when compiling from a pipe.
    pub file: Option<String>,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// Absolute byte offset into the source text.
    pub offset: u32,
}

impl SourceLocation {
    /// Create a location from line, column, and byte offset.
    pub fn new(line: u32, column: u32, offset: u32) -> Self {
        SourceLocation { file: None, line, column, offset }
    }

    /// Attach a file name to this location.
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

impl PartialOrd for SourceLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceLocation {
    fn cmp(&self, other: &Self) -> Ordering {
        // Offsets are authoritative; (line, column) breaks ties for
        // locations synthesized without offsets.
        self.offset
            .cmp(&other.offset)
            .then(self.line.cmp(&other.line))
            .then(self.column.cmp(&other.column))
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// An inclusive range between two source locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRange {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceRange {
    /// Create a range covering `start..=end`.
    pub fn new(start: SourceLocation, end: SourceLocation) -> Self {
        debug_assert!(
            start.offset <= end.offset,
            "range start ({}) must be <= end ({})",
            start.offset,
            end.offset
        );
        SourceRange { start, end }
    }

    /// A zero-width range at a single location.
    pub fn at(loc: SourceLocation) -> Self {
        SourceRange { start: loc.clone(), end: loc }
    }

    /// Merge two ranges into one that covers both.
    pub fn merge(self, other: SourceRange) -> SourceRange {
        let start = if self.start <= other.start { self.start } else { other.start };
        let end = if self.end >= other.end { self.end } else { other.end };
        SourceRange { start, end }
    }

    /// The half-open byte range `start..end+1`, for renderers that want
    /// exclusive ends.
    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.start.offset as usize..(self.end.offset as usize).saturating_add(1)
    }
}

impl std::fmt::Display for SourceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_ordering_by_offset() {
        let a = SourceLocation::new(1, 5, 4);
        let b = SourceLocation::new(2, 1, 10);
        assert!(a < b);
    }

    #[test]
    fn location_ordering_falls_back_to_line_column() {
        // Synthesized locations without offsets order by line, then column.
        let a = SourceLocation::new(3, 1, 0);
        let b = SourceLocation::new(3, 7, 0);
        assert!(a < b);
    }

    #[test]
    fn range_merge_covers_both() {
        let a = SourceRange::new(SourceLocation::new(1, 1, 0), SourceLocation::new(1, 4, 3));
        let b = SourceRange::new(SourceLocation::new(1, 3, 2), SourceLocation::new(2, 1, 9));
        let merged = a.merge(b);
        assert_eq!(merged.start.offset, 0);
        assert_eq!(merged.end.offset, 9);
    }

    #[test]
    fn display_with_and_without_file() {
        let loc = SourceLocation::new(4, 2, 30);
        assert_eq!(loc.to_string(), "4:2");
        let loc = loc.in_file("main.tarn");
        assert_eq!(loc.to_string(), "main.tarn:4:2");
    }
}
