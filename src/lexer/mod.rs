//! Lexical analysis.
//!
//! This module implements an error-tolerant scanner that converts source text
//! into a stream of tokens. The scanner keeps going after errors so a single
//! run reports every illegal character, and it tracks line numbers for the
//! token dump and for diagnostics.

pub mod keywords;
pub mod token;

use crate::diag::Diag;
use smol_str::SmolStr;
use token::{Token, TokenKind, TokenValue};

/// Result of lexical analysis.
///
/// Contains both the tokens produced and any diagnostics encountered.
#[derive(Debug, Clone, PartialEq)]
pub struct LexerResult {
    /// The tokens produced, including an EOF token at the end.
    pub tokens: Vec<Token>,
    /// Diagnostics (errors, warnings) encountered during scanning.
    pub diagnostics: Vec<Diag>,
}

/// Tokenizes source text.
pub fn tokenize(source: &str) -> LexerResult {
    Lexer::new(source).tokenize()
}

/// A lexical analyzer for Pascal-like source text.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: u32,
    tokens: Vec<Token>,
    diagnostics: Vec<Diag>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given source text.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Tokenizes the source text, consuming the lexer.
    pub fn tokenize(mut self) -> LexerResult {
        while !self.is_at_end() {
            self.skip_whitespace_and_comments();
            if self.is_at_end() {
                break;
            }
            self.scan_token();
        }

        let eof_pos = self.source.len();
        self.tokens
            .push(Token::new(TokenKind::Eof, "", self.line, eof_pos..eof_pos));

        LexerResult {
            tokens: self.tokens,
            diagnostics: self.diagnostics,
        }
    }

    /// Skips white space, `// ...` line comments, and nestable `{ ... }`
    /// block comments. Nesting is tracked by a depth counter.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' => {
                    self.advance();
                    self.line += 1;
                }
                '/' if self.peek_next() == '/' => {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                }
                '{' => {
                    let start = self.pos;
                    self.advance();
                    let mut depth = 1u32;
                    while depth > 0 && !self.is_at_end() {
                        match self.advance() {
                            '{' => depth += 1,
                            '}' => depth -= 1,
                            '\n' => self.line += 1,
                            _ => {}
                        }
                    }
                    if depth > 0 {
                        self.diagnostics.push(
                            Diag::error("unterminated block comment")
                                .with_primary_label(start..self.pos, "comment opened here")
                                .with_code("lex::unterminated_comment"),
                        );
                    }
                }
                _ => break,
            }
        }
    }

    /// Scans a single token.
    fn scan_token(&mut self) {
        let start = self.pos;
        let ch = self.advance();

        match ch {
            '+' => self.add_token(TokenKind::Plus, start),
            '-' => self.add_token(TokenKind::Minus, start),
            '*' => self.add_token(TokenKind::Times, start),
            '/' => self.add_token(TokenKind::Divide, start),
            ',' => self.add_token(TokenKind::Comma, start),
            ';' => self.add_token(TokenKind::Semicolon, start),
            '(' => self.add_token(TokenKind::LParen, start),
            ')' => self.add_token(TokenKind::RParen, start),
            '=' => self.add_token(TokenKind::Eq, start),
            ':' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::Assign, start);
                } else {
                    self.add_token(TokenKind::Colon, start);
                }
            }
            '<' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::LtEq, start);
                } else if self.match_char('>') {
                    self.add_token(TokenKind::NotEq, start);
                } else {
                    self.add_token(TokenKind::Lt, start);
                }
            }
            '>' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::GtEq, start);
                } else {
                    self.add_token(TokenKind::Gt, start);
                }
            }
            '0'..='9' => self.scan_number(start),
            'a'..='z' | 'A'..='Z' => self.scan_identifier_or_keyword(start),
            _ => {
                // Error recovery: report and skip the character.
                self.diagnostics.push(
                    Diag::error(format!("illegal character '{ch}'"))
                        .with_primary_label(start..self.pos, "not part of any token")
                        .with_code("lex::illegal_character"),
                );
            }
        }
    }

    /// Scans an integer or real constant.
    ///
    /// Integer constants are `0` or a run starting with a nonzero digit, so
    /// `013` lexes as `0` followed by `13`. A `.` starts the fractional part
    /// only when a digit follows it.
    fn scan_number(&mut self, start: usize) {
        let first = self.source[start..].chars().next();
        if first != Some('0') {
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let mut is_real = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_real = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = &self.source[start..self.pos];
        if is_real {
            match text.parse::<f64>() {
                Ok(value) => self.add_token_with_value(
                    TokenKind::RealConst,
                    start,
                    TokenValue::Real(value),
                ),
                Err(_) => self.diagnostics.push(
                    Diag::error(format!("malformed real constant '{text}'"))
                        .with_primary_label(start..self.pos, "cannot be represented")
                        .with_code("lex::bad_real_constant"),
                ),
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => {
                    self.add_token_with_value(TokenKind::IntConst, start, TokenValue::Int(value))
                }
                Err(_) => self.diagnostics.push(
                    Diag::error(format!("integer constant '{text}' is too large"))
                        .with_primary_label(start..self.pos, "does not fit in 64 bits")
                        .with_code("lex::integer_overflow"),
                ),
            }
        }
    }

    /// Scans an identifier or keyword.
    fn scan_identifier_or_keyword(&mut self, start: usize) {
        while matches!(self.peek(), 'a'..='z' | 'A'..='Z' | '0'..='9' | '_') {
            self.advance();
        }

        let text = &self.source[start..self.pos];
        match keywords::lookup_keyword(text) {
            Some(TokenKind::True) => {
                self.add_token_with_value(TokenKind::True, start, TokenValue::Bool(true))
            }
            Some(TokenKind::False) => {
                self.add_token_with_value(TokenKind::False, start, TokenValue::Bool(false))
            }
            Some(kind) => self.add_token(kind, start),
            None => self.add_token(TokenKind::Id, start),
        }
    }

    fn add_token(&mut self, kind: TokenKind, start: usize) {
        self.add_token_with_value(kind, start, TokenValue::None);
    }

    fn add_token_with_value(&mut self, kind: TokenKind, start: usize, value: TokenValue) {
        let lexeme = SmolStr::new(&self.source[start..self.pos]);
        self.tokens
            .push(Token::with_value(kind, lexeme, value, self.line, start..self.pos));
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Returns the current character without consuming it, or `'\0'` at EOF.
    fn peek(&self) -> char {
        self.source[self.pos..].chars().next().unwrap_or('\0')
    }

    /// Returns the character after the current one, or `'\0'`.
    fn peek_next(&self) -> char {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next().unwrap_or('\0')
    }

    /// Consumes and returns the current character.
    fn advance(&mut self) -> char {
        let ch = self.peek();
        self.pos += ch.len_utf8();
        ch
    }

    /// Consumes the current character if it matches `expected`.
    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_a_small_program() {
        let result = tokenize("PROGRAM p BEGIN x := 1 END");
        assert!(result.diagnostics.is_empty());
        assert_eq!(
            result.tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Program,
                TokenKind::Id,
                TokenKind::Begin,
                TokenKind::Id,
                TokenKind::Assign,
                TokenKind::IntConst,
                TokenKind::End,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scans_multi_character_operators() {
        assert_eq!(
            kinds(":= <= >= <> < > ="),
            vec![
                TokenKind::Assign,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Eq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scans_constants_with_attributes() {
        let result = tokenize("42 0 3.25");
        assert_eq!(result.tokens[0].value, TokenValue::Int(42));
        assert_eq!(result.tokens[1].value, TokenValue::Int(0));
        assert_eq!(result.tokens[2].kind, TokenKind::RealConst);
        assert_eq!(result.tokens[2].value, TokenValue::Real(3.25));
    }

    #[test]
    fn leading_zero_terminates_an_integer() {
        // 013 is not a single constant: it lexes as 0 then 13.
        let result = tokenize("013");
        assert_eq!(result.tokens[0].value, TokenValue::Int(0));
        assert_eq!(result.tokens[1].value, TokenValue::Int(13));
    }

    #[test]
    fn dot_without_digit_is_not_a_real() {
        let result = tokenize("1.");
        assert_eq!(result.tokens[0].kind, TokenKind::IntConst);
        assert!(!result.diagnostics.is_empty()); // the stray '.'
    }

    #[test]
    fn keywords_are_case_insensitive_and_preserve_lexeme() {
        let result = tokenize("Begin END");
        assert_eq!(result.tokens[0].kind, TokenKind::Begin);
        assert_eq!(result.tokens[0].lexeme, "Begin");
        assert_eq!(result.tokens[1].kind, TokenKind::End);
    }

    #[test]
    fn boolean_literals_carry_values() {
        let result = tokenize("TRUE false");
        assert_eq!(result.tokens[0].value, TokenValue::Bool(true));
        assert_eq!(result.tokens[1].value, TokenValue::Bool(false));
    }

    #[test]
    fn line_comments_are_skipped() {
        let result = tokenize("x // the rest is ignored\ny");
        assert_eq!(result.tokens.len(), 3); // x, y, EOF
        assert_eq!(result.tokens[1].line, 2);
    }

    #[test]
    fn block_comments_nest_by_depth() {
        let result = tokenize("x { outer { inner } still outer } y");
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.tokens.len(), 3);
        assert_eq!(result.tokens[1].lexeme, "y");
    }

    #[test]
    fn unterminated_block_comment_is_reported() {
        let result = tokenize("x { never closed");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].code.as_deref(),
            Some("lex::unterminated_comment")
        );
    }

    #[test]
    fn block_comments_track_newlines() {
        let result = tokenize("{ line\nline\n} x");
        assert_eq!(result.tokens[0].line, 3);
    }

    #[test]
    fn illegal_character_is_skipped_and_reported() {
        let result = tokenize("x @ y");
        assert_eq!(result.tokens.len(), 3); // x, y, EOF
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].message.contains('@'));
    }

    #[test]
    fn tracks_line_numbers() {
        let result = tokenize("a\nb\n\nc");
        assert_eq!(result.tokens[0].line, 1);
        assert_eq!(result.tokens[1].line, 2);
        assert_eq!(result.tokens[2].line, 4);
    }

    #[test]
    fn empty_input_yields_only_eof() {
        let result = tokenize("");
        assert_eq!(result.tokens.len(), 1);
        assert_eq!(result.tokens[0].kind, TokenKind::Eof);
    }
}
