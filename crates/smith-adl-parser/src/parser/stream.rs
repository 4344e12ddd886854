//! Token stream wrapper for the hand-written parser.

use smith_adl_ast::Span;
use smith_adl_lexer::Token;
use std::ops::Range;

/// Token stream with lookahead and position tracking.
///
/// Each token is paired with its byte range in the source, so errors and
/// AST nodes carry accurate spans.
pub struct TokenStream<'src> {
    tokens: &'src [(Token, Range<usize>)],
    pos: usize,
    file_id: u16,
}

impl<'src> TokenStream<'src> {
    /// Create a new token stream over tokens with their byte ranges.
    pub fn new(tokens: &'src [(Token, Range<usize>)], file_id: u16) -> Self {
        Self {
            tokens,
            pos: 0,
            file_id,
        }
    }

    /// Peek at the current token without consuming it.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    /// Peek at the nth token ahead without consuming.
    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(tok, _)| tok)
    }

    /// Advance to the next token and return the one consumed.
    pub fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos).map(|(tok, _)| tok);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Check whether the current token has the same discriminant as
    /// `expected` (payloads are ignored).
    pub fn check(&self, expected: &Token) -> bool {
        matches!(self.peek(), Some(t) if std::mem::discriminant(t) == std::mem::discriminant(expected))
    }

    /// Expect a specific token, consuming it on a match.
    pub fn expect(&mut self, expected: Token) -> Result<Span, super::ParseError> {
        if self.check(&expected) {
            let start = self.pos;
            self.advance();
            Ok(self.span_from(start))
        } else {
            Err(super::ParseError::expected_token(
                &expected,
                self.peek(),
                self.current_span(),
            ))
        }
    }

    /// Check whether the stream is exhausted.
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Current position (token index), for span bookkeeping.
    pub fn current_pos(&self) -> usize {
        self.pos
    }

    /// Span covering the tokens from `start` up to the last consumed one.
    pub fn span_from(&self, start: usize) -> Span {
        let Some((_, first)) = self.tokens.get(start) else {
            return self.current_span();
        };
        let end = if self.pos > 0 {
            self.tokens
                .get(self.pos - 1)
                .map(|(_, range)| range.end)
                .unwrap_or(first.end)
        } else {
            first.end
        };
        Span::new(self.file_id, first.start as u32, end as u32)
    }

    /// Span of the current token, or a zero-length span at EOF.
    pub fn current_span(&self) -> Span {
        if let Some((_, range)) = self.tokens.get(self.pos) {
            Span::new(self.file_id, range.start as u32, range.end as u32)
        } else if let Some((_, range)) = self.tokens.last() {
            Span::new(self.file_id, range.end as u32, range.end as u32)
        } else {
            Span::zero(self.file_id)
        }
    }

    /// Skip ahead to the next plausible top-level block start for error
    /// recovery: an identifier followed by a label or an opening brace.
    pub fn synchronize(&mut self) {
        // Always make progress past the offending token.
        self.advance();
        while !self.at_end() {
            if matches!(self.peek(), Some(Token::Ident(_)))
                && matches!(
                    self.peek_nth(1),
                    Some(Token::Str(_)) | Some(Token::LBrace)
                )
            {
                break;
            }
            self.advance();
        }
    }
}
