//! Attribute value parsers.
//!
//! Values are literals (string, number, bool), collections (list, map),
//! or reference expressions. A bare dotted identifier sequence like
//! `model.llama2_instance` is a reference; a single bare identifier is a
//! plain string, which is how `type = number` in variable blocks reads.

use super::{template, ParseError, TokenStream};
use indexmap::IndexMap;
use smith_adl_ast::{Path, Template, TemplatePart, Value};
use smith_adl_lexer::Token;

/// Parse one attribute value.
pub(super) fn parse_value(stream: &mut TokenStream) -> Result<Value, ParseError> {
    let span = stream.current_span();
    match stream.peek().cloned() {
        Some(Token::Str(s)) => {
            stream.advance();
            template::parse_string_value(&s, span)
        }
        Some(Token::Heredoc(s)) => {
            stream.advance();
            template::parse_string_value(&s, span)
        }
        Some(Token::Int(n)) => {
            stream.advance();
            Ok(Value::Number(n as f64))
        }
        Some(Token::Float(n)) => {
            stream.advance();
            Ok(Value::Number(n))
        }
        Some(Token::True) => {
            stream.advance();
            Ok(Value::Bool(true))
        }
        Some(Token::False) => {
            stream.advance();
            Ok(Value::Bool(false))
        }
        Some(Token::LBracket) => parse_list(stream),
        Some(Token::LBrace) => parse_map(stream),
        Some(Token::Ident(first)) => parse_traversal(stream, first),
        other => Err(ParseError::unexpected_token(
            other.as_ref(),
            "in value position",
            span,
        )),
    }
}

/// Parse `[ value, value, ... ]` with an optional trailing comma.
fn parse_list(stream: &mut TokenStream) -> Result<Value, ParseError> {
    stream.expect(Token::LBracket)?;
    let mut items = Vec::new();
    loop {
        if matches!(stream.peek(), Some(Token::RBracket)) {
            stream.advance();
            break;
        }
        items.push(parse_value(stream)?);
        match stream.peek() {
            Some(Token::Comma) => {
                stream.advance();
            }
            Some(Token::RBracket) => {}
            other => {
                return Err(ParseError::unexpected_token(
                    other,
                    "in list, expected ',' or ']'",
                    stream.current_span(),
                ));
            }
        }
    }
    Ok(Value::List(items))
}

/// Parse `{ key = value, ... }`. Keys are identifiers or quoted strings;
/// commas are optional separators.
fn parse_map(stream: &mut TokenStream) -> Result<Value, ParseError> {
    stream.expect(Token::LBrace)?;
    let mut entries: IndexMap<String, Value> = IndexMap::new();
    loop {
        if matches!(stream.peek(), Some(Token::RBrace)) {
            stream.advance();
            break;
        }
        let key_span = stream.current_span();
        let key = match stream.peek().cloned() {
            Some(Token::Ident(name)) => {
                stream.advance();
                name
            }
            Some(Token::Str(name)) => {
                stream.advance();
                name
            }
            other => {
                return Err(ParseError::unexpected_token(
                    other.as_ref(),
                    "in map, expected a key",
                    key_span,
                ));
            }
        };
        stream.expect(Token::Equals)?;
        let value = parse_value(stream)?;
        if entries.insert(key.clone(), value).is_some() {
            return Err(ParseError::invalid_syntax(
                format!("duplicate map key '{}'", key),
                key_span,
            ));
        }
        if matches!(stream.peek(), Some(Token::Comma)) {
            stream.advance();
        }
    }
    Ok(Value::Map(entries))
}

/// Parse a bare identifier or dotted reference.
fn parse_traversal(stream: &mut TokenStream, first: String) -> Result<Value, ParseError> {
    let start = stream.current_pos();
    stream.advance();
    let mut segments = vec![first];
    while matches!(stream.peek(), Some(Token::Dot)) {
        stream.advance();
        let span = stream.current_span();
        match stream.advance().cloned() {
            Some(Token::Ident(segment)) => segments.push(segment),
            other => {
                return Err(ParseError::unexpected_token(
                    other.as_ref(),
                    "after '.', expected an identifier",
                    span,
                ));
            }
        }
    }

    if segments.len() == 1 {
        // A lone identifier is a plain string (`type = number`).
        let Some(word) = segments.pop() else {
            unreachable!("segments starts with one element");
        };
        Ok(Value::String(word))
    } else {
        let span = stream.span_from(start);
        Ok(Value::Template(Template::new(
            vec![TemplatePart::Ref(Path::new(segments))],
            span,
        )))
    }
}
