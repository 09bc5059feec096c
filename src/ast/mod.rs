//! Source positions for rustpython AST nodes

pub mod location;

pub use location::{LineIndex, SourceLocationExt};
