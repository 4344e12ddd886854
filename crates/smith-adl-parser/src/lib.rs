// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Hand-written recursive descent parser for the Agent Definition Language.
//!
//! Parsing is total and side-effect free: the output is the untyped
//! document tree from `smith-adl-ast`, with interpolation spans parsed into
//! template ASTs but never evaluated. Schema checking, variable resolution,
//! and reference binding all live in `smith-adl-resolve`.
//!
//! ## Architecture
//!
//! - `stream`: TokenStream wrapper with lookahead
//! - `error`: ParseError with span and kind
//! - `document`: block and attribute parsers
//! - `value`: attribute value parsers (literals, lists, maps, references)
//! - `template`: `${...}` interpolation and conditional sub-parser

mod parser;

pub use parser::error::{ParseError, ParseErrorKind};
pub use parser::{parse_document, parse_var_file, tokenize, VarFile};
