//! Resolution error taxonomy.
//!
//! Every failure mode of the engine is a distinct variant. Parse failures
//! carry a source location; resolution, validation, and reference failures
//! carry the dotted block/attribute path they occurred at. The engine never
//! recovers locally: errors propagate to the caller unmodified.

use smith_adl_ast::{SourceMap, Span};
use std::fmt;
use thiserror::Error;

/// A file/line/column rendered into error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub col: u32,
}

impl Location {
    /// Resolve a span against the pass's source map.
    pub fn from_span(sources: &SourceMap, span: &Span) -> Self {
        let (line, col) = sources.line_col(span);
        Self {
            file: sources.file_name(span).to_string(),
            line,
            col,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// Any failure of one resolution pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed document text.
    #[error("{location}: syntax error: {message}")]
    Syntax { location: Location, message: String },

    /// Block type (or label-specific shape) absent from the schema
    /// registry.
    #[error("{location}: unknown block type '{block_type}'")]
    UnknownBlockType {
        block_type: String,
        location: Location,
    },

    /// Two blocks share the same `(type, labels)` identity.
    #[error("duplicate block '{id}': first defined at {first}, redefined at {second}")]
    DuplicateBlock {
        id: String,
        first: Location,
        second: Location,
    },

    /// A variable has neither a supplied value nor a default.
    #[error("no value for required variable '{name}'")]
    MissingVariable { name: String },

    /// Declared vs. supplied/resolved type mismatch.
    #[error("{path}: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// A schema rule (required/range/pattern/options/cardinality) failed.
    #[error("{path}: {message}")]
    Validation { path: String, message: String },

    /// Expression resolution re-entered a reference already being
    /// resolved. The cycle lists every reference on the loop, ending where
    /// it started.
    #[error("circular dependency: {}", .cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    /// A reference names a block, attribute, or namespace that does not
    /// exist.
    #[error("{path}: unresolved reference '{reference}'")]
    UnresolvedReference { reference: String, path: String },
}

impl Error {
    /// Build a Syntax error from a parser error and the source map.
    pub fn from_parse(sources: &SourceMap, err: &smith_adl_parser::ParseError) -> Self {
        Error::Syntax {
            location: Location::from_span(sources, &err.span),
            message: err.message.clone(),
        }
    }
}
