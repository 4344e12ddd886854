//! Source location tracking for error reporting.
//!
//! # Design
//!
//! - `Span` — compact byte range into a source file
//! - `SourceMap` — owns all source files for one resolution pass
//! - `SourceFile` — single source file with a line-start index
//!
//! # Examples
//!
//! ```
//! # use smith_adl_ast::span::*;
//! let mut map = SourceMap::new();
//! let file_id = map.add_file("agent.adl", "runtime {\n}\n".to_string());
//! let span = Span::new(file_id, 0, 7);
//!
//! assert_eq!(map.snippet(&span), "runtime");
//! assert_eq!(map.line_col(&span), (1, 1));
//! ```

use serde::{Deserialize, Serialize};

/// Compact source location reference.
///
/// Points to a byte range in a file registered with a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Index into SourceMap files
    pub file_id: u16,
    /// Byte offset of start position
    pub start: u32,
    /// Byte offset of end position (exclusive)
    pub end: u32,
}

impl Span {
    /// Create a new span.
    pub fn new(file_id: u16, start: u32, end: u32) -> Self {
        Self {
            file_id,
            start,
            end,
        }
    }

    /// Create a zero-length span at the start of a file.
    pub fn zero(file_id: u16) -> Self {
        Self::new(file_id, 0, 0)
    }

    /// Merge two spans from the same file into one covering both.
    ///
    /// # Panics
    /// Panics if the spans come from different files.
    pub fn merge(&self, other: &Span) -> Span {
        assert_eq!(
            self.file_id, other.file_id,
            "cannot merge spans from different files"
        );
        Span {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Collection of all source files in one resolution pass.
///
/// Converts [`Span`]s into human-readable locations and snippets.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

/// A single source file with a line-start index.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Display name for this file (path or synthetic name)
    pub name: String,
    /// Original source text
    pub source: String,
    /// Byte offsets of each line start; last entry is the EOF sentinel
    line_starts: Vec<u32>,
}

impl SourceMap {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file and return its id.
    ///
    /// # Panics
    /// Panics if more than `u16::MAX` files are added.
    pub fn add_file(&mut self, name: impl Into<String>, source: String) -> u16 {
        let file_id = self.files.len();
        assert!(file_id < u16::MAX as usize, "too many source files");
        self.files.push(SourceFile::new(name.into(), source));
        file_id as u16
    }

    /// Get the file a span points into.
    pub fn file(&self, span: &Span) -> &SourceFile {
        &self.files[span.file_id as usize]
    }

    /// Get the display name of the file a span points into.
    pub fn file_name(&self, span: &Span) -> &str {
        &self.files[span.file_id as usize].name
    }

    /// Get the source text covered by a span.
    pub fn snippet(&self, span: &Span) -> &str {
        let file = self.file(span);
        &file.source[span.start as usize..span.end as usize]
    }

    /// Get the 1-based (line, column) of a span's start.
    pub fn line_col(&self, span: &Span) -> (u32, u32) {
        self.file(span).line_col(span.start)
    }

    /// Number of registered files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Iterate over the registered files in registration order.
    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }
}

impl SourceFile {
    /// Create a source file, computing its line index.
    pub fn new(name: String, source: String) -> Self {
        let line_starts = compute_line_starts(&source);
        Self {
            name,
            source,
            line_starts,
        }
    }

    /// Get the 1-based (line, column) for a byte offset.
    ///
    /// # Panics
    /// Panics if the offset is beyond EOF.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        assert!(
            offset <= self.source.len() as u32,
            "offset {} is beyond EOF (len = {})",
            offset,
            self.source.len()
        );
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.max(1) - 1,
        };
        let line = (line_idx + 1) as u32;
        let col = (offset - self.line_starts[line_idx]) + 1;
        (line, col)
    }
}

/// Compute byte offsets of line starts, with an EOF sentinel.
fn compute_line_starts(source: &str) -> Vec<u32> {
    let mut line_starts = vec![0];
    for (idx, ch) in source.char_indices() {
        if ch == '\n' {
            line_starts.push((idx + 1) as u32);
        }
    }
    if line_starts.last() != Some(&(source.len() as u32)) {
        line_starts.push(source.len() as u32);
    }
    line_starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_merge_covers_both() {
        let a = Span::new(0, 10, 20);
        let b = Span::new(0, 15, 30);
        let merged = a.merge(&b);
        assert_eq!(merged.start, 10);
        assert_eq!(merged.end, 30);
    }

    #[test]
    #[should_panic(expected = "cannot merge spans from different files")]
    fn span_merge_rejects_cross_file() {
        let a = Span::new(0, 0, 1);
        let b = Span::new(1, 0, 1);
        let _ = a.merge(&b);
    }

    #[test]
    fn line_col_lookup() {
        let file = SourceFile::new("test.adl".into(), "hello\nworld\n".to_string());
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(5), (1, 6));
        assert_eq!(file.line_col(6), (2, 1));
        assert_eq!(file.line_col(11), (2, 6));
    }

    #[test]
    fn source_map_snippet() {
        let mut map = SourceMap::new();
        let file_id = map.add_file("agent.adl", "model \"m1\" {\n}".to_string());
        let span = Span::new(file_id, 6, 10);
        assert_eq!(map.snippet(&span), "\"m1\"");
        assert_eq!(map.file_name(&span), "agent.adl");
        assert_eq!(map.line_col(&span), (1, 7));
    }
}
