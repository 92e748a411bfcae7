//! Diagnostic types and utilities for FSH import
//!
//! Provides diagnostics with:
//! - Precise code positioning with line/column information
//! - Severity classification (error, warning, info)
//! - A collector trait so callers choose how diagnostics are transported

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Represents a diagnostic message from the importer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level of the diagnostic
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Location in the source file
    pub location: Location,
    /// Optional error code (e.g. "RequiredMetadataError")
    pub code: Option<String>,
    /// Optional source of the diagnostic (e.g. "parser", "preprocessor", "visitor")
    pub source: Option<String>,
}

/// Severity levels for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational messages
    Info,
    /// Warnings that should be addressed
    Warning,
    /// Errors that must be fixed
    Error,
}

/// Location information for diagnostics and IR source tracking
///
/// Lines and columns are 1-based; columns count code points, not bytes.
/// `end_line`/`end_column` are inclusive: a single-character token has
/// `end_column == column`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path
    pub file: PathBuf,
    /// Start line (1-based)
    pub line: usize,
    /// Start column (1-based)
    pub column: usize,
    /// Inclusive end position
    pub end_line: usize,
    pub end_column: usize,
    /// Byte offset of the span start
    pub offset: usize,
    /// Byte length of the span
    pub length: usize,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(severity: Severity, message: impl Into<String>, location: Location) -> Self {
        Self {
            severity,
            message: message.into(),
            location,
            code: None,
            source: None,
        }
    }

    pub fn error(message: impl Into<String>, location: Location) -> Self {
        Self::new(Severity::Error, message, location)
    }

    pub fn warning(message: impl Into<String>, location: Location) -> Self {
        Self::new(Severity::Warning, message, location)
    }

    pub fn info(message: impl Into<String>, location: Location) -> Self {
        Self::new(Severity::Info, message, location)
    }

    /// Set the error code for this diagnostic
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the source for this diagnostic
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for Location {
    fn default() -> Self {
        Self {
            file: PathBuf::new(),
            line: 1,
            column: 1,
            end_line: 1,
            end_column: 1,
            offset: 0,
            length: 0,
        }
    }
}

impl Location {
    /// Create a location covering a single point
    pub fn point(file: PathBuf, line: usize, column: usize) -> Self {
        Self {
            file,
            line,
            column,
            end_line: line,
            end_column: column,
            offset: 0,
            length: 0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Trait for collecting and managing diagnostics
pub trait DiagnosticCollector {
    /// Collect a diagnostic
    fn collect(&mut self, diagnostic: Diagnostic);

    /// Collect multiple diagnostics
    fn collect_all(&mut self, diagnostics: Vec<Diagnostic>) {
        for diagnostic in diagnostics {
            self.collect(diagnostic);
        }
    }

    /// Get all collected diagnostics
    fn diagnostics(&self) -> &[Diagnostic];

    /// Check if there are any errors
    fn has_errors(&self) -> bool {
        self.diagnostics()
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Check if there are any warnings
    fn has_warnings(&self) -> bool {
        self.diagnostics()
            .iter()
            .any(|d| d.severity == Severity::Warning)
    }

    /// Get count of diagnostics by severity
    fn count_by_severity(&self) -> HashMap<Severity, usize> {
        let mut counts = HashMap::new();
        for diagnostic in self.diagnostics() {
            *counts.entry(diagnostic.severity).or_insert(0) += 1;
        }
        counts
    }
}

/// Default implementation of DiagnosticCollector
#[derive(Debug, Clone, Default)]
pub struct DefaultDiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DefaultDiagnosticCollector {
    /// Create a new diagnostic collector
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    /// Sort diagnostics by location (file, then line, then column)
    pub fn sort_by_location(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            a.location
                .file
                .cmp(&b.location.file)
                .then_with(|| a.location.line.cmp(&b.location.line))
                .then_with(|| a.location.column.cmp(&b.location.column))
        });
    }

    /// Consume the collector, yielding the diagnostics in collection order
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl DiagnosticCollector for DefaultDiagnosticCollector {
    fn collect(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Format diagnostics as pretty-printed JSON
///
/// Machine-readable transport for callers that post-process diagnostics
/// instead of rendering them to a terminal.
pub fn format_json(diagnostics: &[Diagnostic]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(diagnostics)
}

/// Source map for efficient byte offset to line/column conversion
///
/// Uses a precomputed table of line start offsets for O(log n) lookup.
/// Columns are counted in code points so a multi-byte character occupies
/// a single column.
#[derive(Debug, Clone)]
pub struct SourceMap {
    /// Cumulative byte offsets for each line start (line 1, line 2, ...)
    line_starts: Vec<usize>,
}

impl SourceMap {
    /// Create a source map from source text
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];

        for (idx, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(idx + 1);
            }
        }

        Self { line_starts }
    }

    /// Convert byte offset to (line, column) position, both 1-based
    pub fn offset_to_position(&self, offset: usize, source: &str) -> (usize, usize) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };

        let line = line_idx + 1;

        let line_start = self.line_starts[line_idx];
        let line_text = &source[line_start..offset.min(source.len())];
        let column = line_text.chars().count() + 1;

        (line, column)
    }

    /// Convert a byte span into a [`Location`] with an inclusive end position
    ///
    /// The end line/column address the final character of the span, so a
    /// terminal token satisfies `end_column == column + chars - 1`.
    pub fn span_to_location(
        &self,
        span: &std::ops::Range<usize>,
        source: &str,
        file: &std::path::Path,
    ) -> Location {
        let (line, column) = self.offset_to_position(span.start, source);

        let (end_line, end_column) = if span.end > span.start {
            // Inclusive end: position of the last character in the span.
            let last_char_start = source[span.start..span.end.min(source.len())]
                .char_indices()
                .last()
                .map(|(i, _)| span.start + i)
                .unwrap_or(span.start);
            self.offset_to_position(last_char_start, source)
        } else {
            (line, column)
        };

        Location {
            file: file.to_path_buf(),
            line,
            column,
            end_line,
            end_column,
            offset: span.start,
            length: span.end.saturating_sub(span.start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_single_line() {
        let source = "Hello, World!";
        let map = SourceMap::new(source);

        assert_eq!(map.offset_to_position(0, source), (1, 1));
        assert_eq!(map.offset_to_position(7, source), (1, 8));
        assert_eq!(map.offset_to_position(12, source), (1, 13));
    }

    #[test]
    fn test_multiple_lines() {
        let source = "Profile: Test\nParent: Patient\nTitle: \"Test Profile\"";
        let map = SourceMap::new(source);

        assert_eq!(map.offset_to_position(0, source), (1, 1));
        assert_eq!(map.offset_to_position(9, source), (1, 10));
        assert_eq!(map.offset_to_position(14, source), (2, 1));
        assert_eq!(map.offset_to_position(30, source), (3, 1));
    }

    #[test]
    fn test_unicode_columns_are_code_points() {
        let source = "Profile: 日本語\nTitle: \"Test\"";
        let map = SourceMap::new(source);

        // First Japanese char is at byte 9 but column 10
        assert_eq!(map.offset_to_position(9, source), (1, 10));
        // Second Japanese char: 3 bytes later, one column later
        assert_eq!(map.offset_to_position(12, source), (1, 11));
    }

    #[test]
    fn test_span_to_location_inclusive_end() {
        let source = "Profile: Test\nParent: Patient";
        let map = SourceMap::new(source);

        // Span covering "Test" (bytes 9..13)
        let loc = map.span_to_location(&(9..13), source, Path::new("test.fsh"));
        assert_eq!(loc.line, 1);
        assert_eq!(loc.column, 10);
        assert_eq!(loc.end_line, 1);
        // Inclusive: 't' of "Test" sits at column 13
        assert_eq!(loc.end_column, 13);
        assert_eq!(loc.length, 4);
    }

    #[test]
    fn test_collector_counts() {
        let mut collector = DefaultDiagnosticCollector::new();
        collector.collect(Diagnostic::error("boom", Location::default()));
        collector.collect(Diagnostic::warning("hmm", Location::default()));

        assert!(collector.has_errors());
        assert!(collector.has_warnings());
        assert_eq!(collector.count_by_severity()[&Severity::Error], 1);
    }

    #[test]
    fn test_format_json_round_trips() {
        let diagnostics = vec![
            Diagnostic::error("boom", Location::default()).with_code("RequiredMetadataError"),
            Diagnostic::warning("hmm", Location::default()).with_source("visitor"),
        ];

        let json = format_json(&diagnostics).unwrap();
        assert!(json.contains("\"boom\""));
        assert!(json.contains("RequiredMetadataError"));

        let parsed: Vec<Diagnostic> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, diagnostics);
    }
}
