//! Shared parser infrastructure for token stream navigation and error
//! handling.

use crate::diag::Diag;
use crate::lexer::token::{Token, TokenKind};

/// Common error type for parsing operations.
pub type ParseError = Box<Diag>;

/// Common result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Token stream navigator.
///
/// Encapsulates lookahead and matching over a lexed token slice. The slice
/// must be non-empty and end with an EOF token, which the lexer guarantees.
pub struct TokenStream<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenStream<'a> {
    /// Creates a new token stream from a token slice.
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Returns the current token.
    pub fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .unwrap_or_else(|| self.tokens.last().expect("token stream must be non-empty"))
    }

    /// Returns the next token without consuming the current one.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    /// Advances to the next token. Does nothing once at EOF.
    pub fn advance(&mut self) {
        if self.pos < self.tokens.len().saturating_sub(1) {
            self.pos += 1;
        }
    }

    /// Checks if the current token matches the given kind.
    pub fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    /// Consumes the current token if it matches the given kind.
    pub fn consume(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expects a specific token kind and returns the consumed token.
    pub fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            let token = self.current().clone();
            self.advance();
            Ok(token)
        } else {
            let found = self.current();
            Err(self.error_here(format!("expected {kind}, found {}", found.kind)))
        }
    }

    /// Creates an error at the current token position.
    pub fn error_here(&self, message: impl Into<String>) -> ParseError {
        Box::new(
            Diag::error(message.into())
                .with_primary_label(self.current().span.clone(), "here")
                .with_code("syntax::unexpected_token"),
        )
    }

    /// Returns the current position in the token stream.
    pub fn position(&self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tokens() -> Vec<Token> {
        vec![
            Token::new(TokenKind::Begin, "BEGIN", 1, 0..5),
            Token::new(TokenKind::Id, "x", 1, 6..7),
            Token::new(TokenKind::Assign, ":=", 1, 8..10),
            Token::new(TokenKind::End, "END", 1, 11..14),
            Token::new(TokenKind::Eof, "", 1, 14..14),
        ]
    }

    #[test]
    fn navigation() {
        let tokens = make_tokens();
        let mut stream = TokenStream::new(&tokens);

        assert_eq!(stream.current().kind, TokenKind::Begin);
        assert_eq!(stream.peek().map(|t| t.kind), Some(TokenKind::Id));

        stream.advance();
        assert_eq!(stream.current().kind, TokenKind::Id);
        assert_eq!(stream.position(), 1);
    }

    #[test]
    fn check_and_consume() {
        let tokens = make_tokens();
        let mut stream = TokenStream::new(&tokens);

        assert!(stream.check(TokenKind::Begin));
        assert!(!stream.check(TokenKind::End));

        assert!(stream.consume(TokenKind::Begin));
        assert!(!stream.consume(TokenKind::Begin));
        assert_eq!(stream.current().kind, TokenKind::Id);
    }

    #[test]
    fn expect_success_returns_the_token() {
        let tokens = make_tokens();
        let mut stream = TokenStream::new(&tokens);

        let token = stream.expect(TokenKind::Begin).unwrap();
        assert_eq!(token.lexeme, "BEGIN");
        assert_eq!(stream.current().kind, TokenKind::Id);
    }

    #[test]
    fn expect_failure_keeps_position() {
        let tokens = make_tokens();
        let mut stream = TokenStream::new(&tokens);

        let err = stream.expect(TokenKind::End).unwrap_err();
        assert!(err.message.contains("expected END"));
        assert_eq!(stream.current().kind, TokenKind::Begin);
    }

    #[test]
    fn advancing_past_eof_stays_at_eof() {
        let tokens = make_tokens();
        let mut stream = TokenStream::new(&tokens);

        for _ in 0..10 {
            stream.advance();
        }
        assert_eq!(stream.current().kind, TokenKind::Eof);
    }
}
