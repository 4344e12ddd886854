// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! AST types for the Agent Definition Language.
//!
//! This crate contains the untyped document tree produced by the parser
//! (blocks, attributes, values, string templates) and the foundation types
//! shared by every stage of the pipeline (source spans, reference paths).
//! Nothing here evaluates anything: templates and references stay symbolic
//! until `smith-adl-resolve` substitutes them.

pub mod document;
pub mod path;
pub mod span;
pub mod template;
pub mod value;

pub use document::{Attribute, Block, Document};
pub use path::Path;
pub use span::{SourceFile, SourceMap, Span};
pub use template::{CmpOp, Condition, Conditional, Operand, Template, TemplatePart};
pub use value::Value;
