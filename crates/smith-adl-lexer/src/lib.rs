// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Lexical analysis for the Agent Definition Language.
//!
//! Tokenization uses logos. The language has no reserved block keywords:
//! block types and attribute names are plain identifiers, so the token set
//! is small — punctuation, literals, identifiers.
//!
//! # Design
//!
//! - Comments (`#`, `//`, `/* */`) and whitespace are stripped during
//!   lexing, never tokens.
//! - String literals keep `${...}` spans verbatim; escape sequences are
//!   processed here, template parsing happens in the parser.
//! - Heredocs (`<<TAG` / `<<-TAG`) are lexed with a callback that consumes
//!   the body up to the terminator line.
//!
//! # Examples
//!
//! ```
//! # use smith_adl_lexer::Token;
//! # use logos::Logos;
//! let source = r#"model "m1" { provider = "ollama" }"#;
//! let tokens: Vec<_> = Token::lexer(source).collect();
//! assert_eq!(tokens.len(), 7);
//! ```

use logos::{Lexer, Logos};
use std::fmt;

/// ADL token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")] // Skip whitespace (newlines are not significant)
#[logos(skip r"#[^\n]*")] // Skip # comments
#[logos(skip r"//[^\n]*")] // Skip // comments
#[logos(skip r"/\*([^*]|\*[^/])*\*/")] // Skip /* */ comments
pub enum Token {
    // === Delimiters ===
    /// Delimiter `{`
    #[token("{")]
    LBrace,
    /// Delimiter `}`
    #[token("}")]
    RBrace,
    /// Delimiter `[`
    #[token("[")]
    LBracket,
    /// Delimiter `]`
    #[token("]")]
    RBracket,
    /// Separator `,`
    #[token(",")]
    Comma,
    /// Separator `.` (reference traversal)
    #[token(".")]
    Dot,
    /// Assignment `=`
    #[token("=")]
    Equals,

    // === Literals ===
    /// Boolean literal `true`
    #[token("true")]
    True,
    /// Boolean literal `false`
    #[token("false")]
    False,

    /// Integer literal (e.g., 1000, -2)
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    /// Float literal (e.g., 0.7, 1.5e-3)
    #[regex(r"-?[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"-?[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    /// Quoted string literal.
    ///
    /// Escape sequences are processed; `${...}` interpolation spans are kept
    /// verbatim for the parser's template pass.
    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len() - 1])
    })]
    Str(String),

    /// Heredoc string literal: `<<TAG` ... `TAG`, or `<<-TAG` with
    /// indentation stripping.
    #[regex(r"<<-?[A-Za-z_][A-Za-z0-9_]*", lex_heredoc)]
    Heredoc(String),

    /// Identifier: block types, attribute names, reference segments.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// Process backslash escapes in a quoted string body.
///
/// Returns None on an unknown escape, which surfaces as a lexer error token.
fn unescape_string(s: &str) -> Option<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                _ => return None,
            }
        } else {
            result.push(c);
        }
    }
    Some(result)
}

/// Consume a heredoc body from the remainder of the input.
///
/// The matched slice is the `<<TAG` (or `<<-TAG`) opener; the callback eats
/// everything through the line that contains only the terminator tag. For
/// the `<<-` form, the common leading indentation of the body is stripped.
fn lex_heredoc(lex: &mut Lexer<Token>) -> Option<String> {
    let opener = lex.slice();
    let (indented, tag) = match opener.strip_prefix("<<-") {
        Some(tag) => (true, tag),
        None => (false, &opener[2..]),
    };

    let rem = lex.remainder();
    let first_nl = rem.find('\n')?;
    // Only trailing whitespace may follow the opener on its own line.
    if !rem[..first_nl].trim().is_empty() {
        return None;
    }

    let body_start = first_nl + 1;
    let mut pos = body_start;
    let mut terminator = None;
    for line in rem[body_start..].split_inclusive('\n') {
        let text = line.trim_end_matches(['\n', '\r']);
        let candidate = if indented { text.trim_start() } else { text };
        if candidate == tag {
            terminator = Some((pos, pos + line.len()));
            break;
        }
        pos += line.len();
    }

    let (body_end, opener_to_term_end) = terminator?;
    let mut content = rem[body_start..body_end].to_string();
    if indented {
        content = strip_common_indent(&content);
    }
    lex.bump(opener_to_term_end);
    Some(content)
}

/// Strip the smallest leading whitespace prefix shared by all non-empty
/// lines.
fn strip_common_indent(body: &str) -> String {
    let min_indent = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    body.lines()
        .map(|line| {
            if line.len() >= min_indent {
                &line[min_indent..]
            } else {
                line.trim_start()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        + if body.ends_with('\n') { "\n" } else { "" }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Comma => write!(f, "','"),
            Token::Dot => write!(f, "'.'"),
            Token::Equals => write!(f, "'='"),
            Token::True => write!(f, "'true'"),
            Token::False => write!(f, "'false'"),
            Token::Int(n) => write!(f, "{}", n),
            Token::Float(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Heredoc(_) => write!(f, "heredoc"),
            Token::Ident(name) => write!(f, "'{}'", name),
        }
    }
}
