//! # Lexer
//!
//! Turns document text into tokens for the record parser.
//!
//! The lexer never fails: characters it cannot classify and unterminated
//! strings become [`TokenKind::Error`] tokens plus an advisory, and the
//! parser decides how to recover. Newlines are not tokens; instead every
//! token records whether a newline preceded it, which the parser treats as a
//! field separator.

use std::str::Chars;

use crate::diagnostics::Advisory;
use crate::syntax::{Position, Span};

// =============================================================================
// TOKENS
// =============================================================================

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenKind {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Colon,
    Comma,
    Dot,
    Ellipsis,
    Operator,
    String,
    Number,
    Ident,
    Error,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    /// A newline separates this token from the previous one.
    pub newline_before: bool,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }
}

/// Two-character operators, longest match first.
const TWO_CHAR_OPERATORS: [&str; 8] = ["==", "!=", "<=", ">=", "=~", "!~", "&&", "||"];
const ONE_CHAR_OPERATORS: &str = "|&+-*/=!<>?";

// =============================================================================
// CURSOR
// =============================================================================

/// Character cursor with 1-based line/column tracking.
struct Cursor<'a> {
    source: &'a str,
    chars: Chars<'a>,
    byte: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars(),
            byte: 0,
            line: 1,
            column: 1,
        }
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.chars.clone().nth(n)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.byte..]
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.byte += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn advance_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&predicate) {
            self.advance();
        }
    }

    fn slice_from(&self, start: usize) -> &'a str {
        &self.source[start..self.byte]
    }
}

// =============================================================================
// LEXER
// =============================================================================

/// Tokenizes `source`. The returned stream always ends with an `Eof` token.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Advisory>) {
    let mut lexer = Lexer {
        cursor: Cursor::new(source),
        tokens: Vec::new(),
        advisories: Vec::new(),
        newline_pending: false,
    };
    lexer.run();
    (lexer.tokens, lexer.advisories)
}

struct Lexer<'a> {
    cursor: Cursor<'a>,
    tokens: Vec<Token>,
    advisories: Vec<Advisory>,
    newline_pending: bool,
}

impl<'a> Lexer<'a> {
    fn run(&mut self) {
        loop {
            self.skip_trivia();
            let start = self.cursor.position();
            let start_byte = self.cursor.byte;
            let Some(c) = self.cursor.peek() else {
                self.push(TokenKind::Eof, String::new(), Span::point(start));
                return;
            };

            let kind = match c {
                '{' => self.single(TokenKind::LBrace),
                '}' => self.single(TokenKind::RBrace),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                ':' => self.single(TokenKind::Colon),
                ',' => self.single(TokenKind::Comma),
                '.' if self.cursor.rest().starts_with("...") => {
                    for _ in 0..3 {
                        self.cursor.advance();
                    }
                    TokenKind::Ellipsis
                }
                '.' if self.cursor.peek_nth(1).is_some_and(|d| d.is_ascii_digit()) => {
                    self.number()
                }
                '.' => self.single(TokenKind::Dot),
                '"' | '\'' => self.string(start),
                '#' if self.raw_string_ahead() => self.string(start),
                '#' | '_' | '$' => self.identifier(),
                '@' => match self.attribute(start) {
                    Some(kind) => kind,
                    None => continue,
                },
                c if c.is_ascii_digit() => self.number(),
                c if c.is_alphabetic() => self.identifier(),
                _ => self.operator(start),
            };

            let text = self.cursor.slice_from(start_byte).to_string();
            let span = Span::new(start, self.cursor.position());
            self.push(kind, text, span);
        }
    }

    fn push(&mut self, kind: TokenKind, text: String, span: Span) {
        self.tokens.push(Token {
            kind,
            text,
            span,
            newline_before: std::mem::take(&mut self.newline_pending),
        });
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.cursor.advance();
        kind
    }

    /// Skips whitespace and `//` comments, remembering crossed newlines.
    fn skip_trivia(&mut self) {
        loop {
            match self.cursor.peek() {
                Some('\n') => {
                    self.newline_pending = true;
                    self.cursor.advance();
                }
                Some(c) if c.is_whitespace() => {
                    self.cursor.advance();
                }
                Some('/') if self.cursor.peek_nth(1) == Some('/') => {
                    self.cursor.advance_while(|c| c != '\n');
                }
                _ => return,
            }
        }
    }

    fn raw_string_ahead(&self) -> bool {
        let rest = self.cursor.rest();
        let body = rest.trim_start_matches('#');
        body.starts_with('"') || body.starts_with('\'')
    }

    fn string(&mut self, start: Position) -> TokenKind {
        let mut hashes = 0;
        while self.cursor.peek() == Some('#') {
            hashes += 1;
            self.cursor.advance();
        }
        let Some(quote) = self.cursor.advance() else {
            return TokenKind::Error;
        };
        let multiline = self.cursor.peek() == Some(quote) && self.cursor.peek_nth(1) == Some(quote);
        let closing: String = if multiline {
            self.cursor.advance();
            self.cursor.advance();
            std::iter::repeat(quote).take(3).collect()
        } else {
            quote.to_string()
        };
        let terminator = format!("{closing}{}", "#".repeat(hashes));

        loop {
            if self.cursor.rest().starts_with(&terminator) {
                for _ in 0..terminator.chars().count() {
                    self.cursor.advance();
                }
                return TokenKind::String;
            }
            match self.cursor.peek() {
                None => break,
                Some('\n') if !multiline => break,
                Some('\\') if hashes == 0 => {
                    self.cursor.advance();
                    self.cursor.advance();
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }

        self.advisories.push(Advisory::recoverable_syntax(
            "unterminated string literal",
            Some(start),
        ));
        TokenKind::Error
    }

    fn number(&mut self) -> TokenKind {
        loop {
            match self.cursor.peek() {
                Some(c) if c.is_ascii_alphanumeric() || c == '_' => {
                    let exponent = matches!(c, 'e' | 'E');
                    self.cursor.advance();
                    if exponent && matches!(self.cursor.peek(), Some('+' | '-')) {
                        self.cursor.advance();
                    }
                }
                Some('.') if self.cursor.peek_nth(1).is_some_and(|d| d.is_ascii_digit()) => {
                    self.cursor.advance();
                }
                _ => return TokenKind::Number,
            }
        }
    }

    fn identifier(&mut self) -> TokenKind {
        self.cursor.advance();
        self.cursor
            .advance_while(|c| c.is_alphanumeric() || c == '_' || c == '$');
        TokenKind::Ident
    }

    /// `@name(...)` attributes are dropped; a bare `@name` lexes as an identifier.
    fn attribute(&mut self, start: Position) -> Option<TokenKind> {
        self.cursor.advance();
        self.cursor
            .advance_while(|c| c.is_alphanumeric() || c == '_' || c == '$');
        if self.cursor.peek() != Some('(') {
            return Some(TokenKind::Ident);
        }
        let mut depth = 0usize;
        while let Some(c) = self.cursor.advance() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return None;
                    }
                }
                _ => {}
            }
        }
        self.advisories.push(Advisory::recoverable_syntax(
            "unterminated attribute",
            Some(start),
        ));
        None
    }

    fn operator(&mut self, start: Position) -> TokenKind {
        let rest = self.cursor.rest();
        if let Some(op) = TWO_CHAR_OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            for _ in 0..op.len() {
                self.cursor.advance();
            }
            return TokenKind::Operator;
        }
        match self.cursor.advance() {
            Some(c) if ONE_CHAR_OPERATORS.contains(c) => TokenKind::Operator,
            Some(c) => {
                self.advisories.push(Advisory::recoverable_syntax(
                    format!("unexpected character `{c}`"),
                    Some(start),
                ));
                TokenKind::Error
            }
            None => TokenKind::Eof,
        }
    }
}
