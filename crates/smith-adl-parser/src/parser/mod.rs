//! Parser internals.
//!
//! The public API is [`tokenize`] and [`parse_document`]; everything else
//! is plumbing for the recursive descent.

pub mod error;
mod stream;

pub use error::ParseError;
use stream::TokenStream;

mod document;
mod template;
mod value;

pub use document::VarFile;

use logos::Logos;
use smith_adl_ast::{Document, Span};
use smith_adl_lexer::Token;
use std::ops::Range;

/// Tokenize a source string, pairing each token with its byte range.
///
/// Fails on the first unrecognized token (bad escape, unterminated
/// heredoc, stray character).
pub fn tokenize(source: &str, file_id: u16) -> Result<Vec<(Token, Range<usize>)>, ParseError> {
    let mut tokens = Vec::new();
    for (result, range) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, range)),
            Err(()) => {
                return Err(ParseError::invalid_token(Span::new(
                    file_id,
                    range.start as u32,
                    range.end as u32,
                )));
            }
        }
    }
    Ok(tokens)
}

/// Parse one source file into a [`Document`].
///
/// On failure, returns every error found: after a malformed block the
/// parser skips ahead to the next plausible block start and continues, so
/// multiple independent mistakes are reported in one pass.
pub fn parse_document(source: &str, file_id: u16) -> Result<Document, Vec<ParseError>> {
    let tokens = tokenize(source, file_id).map_err(|e| vec![e])?;
    let mut stream = TokenStream::new(&tokens, file_id);

    let mut blocks = Vec::new();
    let mut errors = Vec::new();

    while !stream.at_end() {
        match document::parse_block(&mut stream) {
            Ok(block) => blocks.push(block),
            Err(e) => {
                errors.push(e);
                stream.synchronize();
            }
        }
    }

    if errors.is_empty() {
        Ok(Document { blocks, file_id })
    } else {
        Err(errors)
    }
}

/// Parse a variable override file (`*.vars.adl`): top-level assignments
/// and `variable` blocks.
pub fn parse_var_file(source: &str, file_id: u16) -> Result<VarFile, ParseError> {
    let tokens = tokenize(source, file_id)?;
    let mut stream = TokenStream::new(&tokens, file_id);
    document::parse_var_file_content(&mut stream)
}
