//! Location extraction from rustpython AST nodes
//!
//! rustpython-parser 0.3 gives byte offsets through the `Ranged` trait. A
//! `LineIndex` built once per file turns them into line and column pairs.

use crate::errors::SourceLocation;
use rustpython_parser::ast::{Expr, Ranged, Stmt};

/// Byte offset to line/column conversion for one source file
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based line, 0-based column.
    pub fn offset_to_position(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        let column = offset.saturating_sub(self.line_starts[line]);
        (line + 1, column)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn locate<T: Ranged>(&self, node: &T) -> SourceLocation {
        let range = node.range();
        SourceLocation::from_range(
            self.offset_to_position(range.start().to_usize()),
            self.offset_to_position(range.end().to_usize()),
        )
    }
}

pub trait SourceLocationExt {
    fn source_location(&self, index: &LineIndex) -> SourceLocation;
}

impl SourceLocationExt for Expr {
    fn source_location(&self, index: &LineIndex) -> SourceLocation {
        index.locate(self)
    }
}

impl SourceLocationExt for Stmt {
    fn source_location(&self, index: &LineIndex) -> SourceLocation {
        index.locate(self)
    }
}
