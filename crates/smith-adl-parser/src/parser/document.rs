//! Block and attribute parsers.
//!
//! Grammar:
//!
//! ```text
//! document  = block*
//! block     = IDENT STRING{0,2} "{" body "}"
//! body      = (attribute | block)*
//! attribute = IDENT "=" value
//! ```

use super::{value, ParseError, TokenStream};
use smith_adl_ast::{Attribute, Block};
use smith_adl_lexer::Token;

/// Parse one top-level or nested block.
pub(super) fn parse_block(stream: &mut TokenStream) -> Result<Block, ParseError> {
    let start = stream.current_pos();
    let block_type = expect_ident(stream, "as block type")?;
    parse_block_rest(stream, block_type, start)
}

/// Parse the labels and body of a block whose type identifier has already
/// been consumed.
fn parse_block_rest(
    stream: &mut TokenStream,
    block_type: String,
    start: usize,
) -> Result<Block, ParseError> {
    let mut labels = Vec::new();
    while let Some(Token::Str(label)) = stream.peek() {
        labels.push(label.clone());
        stream.advance();
    }
    if labels.len() > 2 {
        return Err(ParseError::invalid_syntax(
            format!("block '{}' has {} labels, at most 2 are allowed", block_type, labels.len()),
            stream.span_from(start),
        ));
    }

    stream.expect(Token::LBrace)?;

    let mut attributes: Vec<Attribute> = Vec::new();
    let mut nested = Vec::new();

    loop {
        match stream.peek() {
            Some(Token::RBrace) => {
                stream.advance();
                break;
            }
            Some(Token::Ident(_)) => {
                let entry_start = stream.current_pos();
                let name = expect_ident(stream, "in block body")?;
                match stream.peek() {
                    Some(Token::Equals) => {
                        stream.advance();
                        let value = value::parse_value(stream)?;
                        let span = stream.span_from(entry_start);
                        if attributes.iter().any(|attr| attr.name == name) {
                            return Err(ParseError::invalid_syntax(
                                format!("duplicate attribute '{}'", name),
                                span,
                            ));
                        }
                        attributes.push(Attribute { name, value, span });
                    }
                    Some(Token::Str(_)) | Some(Token::LBrace) => {
                        nested.push(parse_block_rest(stream, name, entry_start)?);
                    }
                    other => {
                        return Err(ParseError::unexpected_token(
                            other,
                            "after name, expected '=' or a block body",
                            stream.current_span(),
                        ));
                    }
                }
            }
            other => {
                return Err(ParseError::unexpected_token(
                    other,
                    "in block body, expected an attribute, a nested block, or '}'",
                    stream.current_span(),
                ));
            }
        }
    }

    Ok(Block {
        block_type,
        labels,
        attributes,
        nested,
        span: stream.span_from(start),
    })
}

/// A parsed variable override file: top-level `name = value` assignments
/// plus `variable` blocks supplying defaults.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VarFile {
    pub assignments: Vec<Attribute>,
    pub blocks: Vec<Block>,
}

/// Parse an override file. The grammar is the block body grammar at the
/// top level: assignments and blocks, no recovery.
pub(super) fn parse_var_file_content(stream: &mut TokenStream) -> Result<VarFile, ParseError> {
    let mut file = VarFile::default();

    while !stream.at_end() {
        let entry_start = stream.current_pos();
        let name = expect_ident(stream, "in override file")?;
        match stream.peek() {
            Some(Token::Equals) => {
                stream.advance();
                let value = value::parse_value(stream)?;
                let span = stream.span_from(entry_start);
                if file.assignments.iter().any(|attr| attr.name == name) {
                    return Err(ParseError::invalid_syntax(
                        format!("duplicate assignment '{}'", name),
                        span,
                    ));
                }
                file.assignments.push(Attribute { name, value, span });
            }
            Some(Token::Str(_)) | Some(Token::LBrace) => {
                file.blocks.push(parse_block_rest(stream, name, entry_start)?);
            }
            other => {
                return Err(ParseError::unexpected_token(
                    other,
                    "after name, expected '=' or a block body",
                    stream.current_span(),
                ));
            }
        }
    }

    Ok(file)
}

/// Consume an identifier token, or fail with context.
fn expect_ident(stream: &mut TokenStream, context: &str) -> Result<String, ParseError> {
    let span = stream.current_span();
    match stream.advance() {
        Some(Token::Ident(name)) => Ok(name.clone()),
        other => Err(ParseError::unexpected_token(other, context, span)),
    }
}
