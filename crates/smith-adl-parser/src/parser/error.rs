//! Parse error types.

use smith_adl_ast::Span;
use smith_adl_lexer::Token;
use std::fmt;

/// Parse error with source location and context.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Kind of parse error
    pub kind: ParseErrorKind,
    /// Source location where the error occurred
    pub span: Span,
    /// Human-readable error message
    pub message: String,
}

/// Category of parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The lexer could not recognize the input at this position.
    InvalidToken,

    /// A specific token was expected but a different one was found.
    UnexpectedToken,

    /// Input ended while a construct was incomplete (unclosed block,
    /// truncated value).
    UnexpectedEof,

    /// Tokens are present but violate the grammar (three labels on a
    /// block, duplicate attribute, malformed map entry).
    InvalidSyntax,

    /// A string's `${...}` interpolation content is malformed
    /// (unterminated span, empty reference).
    InvalidTemplate,
}

impl ParseError {
    /// Create an "expected token" error.
    pub fn expected_token(expected: &Token, found: Option<&Token>, span: Span) -> Self {
        let message = match found {
            Some(token) => format!("expected {}, found {}", expected, token),
            None => format!("expected {}, found end of input", expected),
        };
        Self {
            kind: if found.is_none() {
                ParseErrorKind::UnexpectedEof
            } else {
                ParseErrorKind::UnexpectedToken
            },
            span,
            message,
        }
    }

    /// Create an "unexpected token" error with context.
    pub fn unexpected_token(found: Option<&Token>, context: &str, span: Span) -> Self {
        let message = match found {
            Some(token) => format!("unexpected {} {}", token, context),
            None => format!("unexpected end of input {}", context),
        };
        Self {
            kind: if found.is_none() {
                ParseErrorKind::UnexpectedEof
            } else {
                ParseErrorKind::UnexpectedToken
            },
            span,
            message,
        }
    }

    /// Create an "invalid syntax" error.
    pub fn invalid_syntax(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::InvalidSyntax,
            span,
            message: message.into(),
        }
    }

    /// Create an "invalid template" error.
    pub fn invalid_template(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::InvalidTemplate,
            span,
            message: message.into(),
        }
    }

    /// Create an "invalid token" error (lexer failure).
    pub fn invalid_token(span: Span) -> Self {
        Self {
            kind: ParseErrorKind::InvalidToken,
            span,
            message: "unrecognized token".to_string(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}
