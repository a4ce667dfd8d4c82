//! Tolerant recursive-descent parser for record-literal documents.
//!
//! The parser never gives up on the first error. Unexpected tokens are
//! reported as recoverable advisories and the parser resynchronises at the
//! next field separator (comma, newline or closing brace). Unclosed records
//! are closed at end of input. The only hard failure is a document with
//! significant tokens from which not a single field, record or list could be
//! built.

use tracing::debug;

use crate::diagnostics::{Advisory, ScanError};
use crate::syntax::lexer::{tokenize, Token, TokenKind};
use crate::syntax::{
    Expression, Field, Identifier, Label, List, Literal, LiteralKind, Node, Position, Record, Span,
};

/// Records and lists nested deeper than this are skipped.
pub const MAX_NESTING_DEPTH: usize = 128;

const BINARY_OPERATORS: [&str; 14] = [
    "|", "&", "+", "-", "*", "/", "==", "!=", "<", "<=", ">", ">=", "=~", "!~",
];
const LOGICAL_OPERATORS: [&str; 2] = ["&&", "||"];
const PREFIX_OPERATORS: [&str; 10] = ["-", "+", "!", "*", "<", "<=", ">", ">=", "!=", "=~"];

// ============================================================================
// PUBLIC API
// ============================================================================

/// Converts document text into a record tree.
pub trait StructuralParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<ParsedDocument, ScanError>;
}

/// The in-process parser for the CUE-style record-literal subset.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordParser;

impl StructuralParser for RecordParser {
    fn parse(&self, source: &str) -> Result<ParsedDocument, ScanError> {
        parse_document(source)
    }
}

/// A parsed document: the root record plus everything the parser recovered from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub root: Record,
    pub diagnostics: Vec<Advisory>,
}

impl ParsedDocument {
    /// True when the tree is a best-effort reconstruction.
    pub fn is_partial(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Parses `source` into a [`ParsedDocument`].
pub fn parse_document(source: &str) -> Result<ParsedDocument, ScanError> {
    let (tokens, diagnostics) = tokenize(source);
    let mut parser = Parser::new(tokens, diagnostics);
    parser.skip_preamble();

    let first = parser.peek().clone();
    let end = parser.eof_position();
    let elements = parser.parse_elements(false);

    if parser.built == 0 && first.kind != TokenKind::Eof {
        return Err(ScanError::structural_failure(
            format!("expected record-literal syntax, found `{}`", first.text),
            Some(first.span.start),
        ));
    }

    let root = promote_root(Record {
        span: Span::new(Position::default(), end),
        elements,
    });

    Ok(ParsedDocument {
        root,
        diagnostics: parser.diagnostics,
    })
}

/// A document whose only element is a braced record is that record.
fn promote_root(mut root: Record) -> Record {
    if root.elements.len() == 1 && matches!(root.elements[0], Node::Record(_)) {
        if let Some(Node::Record(inner)) = root.elements.pop() {
            return inner;
        }
    }
    root
}

// ============================================================================
// PARSER
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: Vec<Advisory>,
    /// Fields, records and lists built so far.
    built: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>, diagnostics: Vec<Advisory>) -> Self {
        Self {
            tokens,
            current: 0,
            diagnostics,
            built: 0,
            depth: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Document structure
    // ------------------------------------------------------------------------

    /// Skips a leading `package` clause and `import` declarations.
    fn skip_preamble(&mut self) {
        if self.at_keyword("package") && self.peek_at(1).is(TokenKind::Ident) {
            self.advance();
            self.advance();
        }
        while self.at_keyword("import") {
            self.advance();
            if self.check(TokenKind::LParen) {
                self.skip_balanced();
            } else {
                while !self.check(TokenKind::Eof) && !self.peek().newline_before {
                    self.advance();
                }
            }
        }
    }

    /// Parses record elements until `}` (when `braced`) or end of input.
    fn parse_elements(&mut self, braced: bool) -> Vec<Node> {
        let mut elements = Vec::new();
        loop {
            while self.check(TokenKind::Comma) {
                self.advance();
            }
            match self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::RBrace if braced => break,
                TokenKind::RBrace => {
                    let token = self.advance();
                    self.report("unmatched `}`", token.span.start);
                    continue;
                }
                _ => {}
            }

            let before = self.current;
            match self.parse_element() {
                Some(node) => elements.push(node),
                None => {
                    let token = self.peek().clone();
                    self.report(format!("unexpected `{}`", token.text), token.span.start);
                    if self.current == before {
                        self.synchronize();
                    }
                    continue;
                }
            }
            self.expect_separator();
        }
        elements
    }

    fn parse_element(&mut self) -> Option<Node> {
        if self.at_comprehension() {
            return self.parse_comprehension();
        }
        if let Some(label_len) = self.field_label_len() {
            return Some(self.parse_field(label_len));
        }
        self.parse_expression()
    }

    fn expect_separator(&mut self) {
        let token = self.peek();
        match token.kind {
            TokenKind::Comma => {
                self.advance();
            }
            TokenKind::RBrace | TokenKind::Eof => {}
            _ if token.newline_before => {}
            _ => {
                let token = token.clone();
                self.report(
                    format!("expected `,` or newline, found `{}`", token.text),
                    token.span.start,
                );
                self.synchronize();
            }
        }
    }

    /// Skips tokens up to the next separator, stepping over bracketed groups.
    fn synchronize(&mut self) {
        if self.is_opener() {
            self.skip_balanced();
        } else {
            self.advance();
        }
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eof | TokenKind::RBrace => return,
                TokenKind::Comma => {
                    self.advance();
                    return;
                }
                _ if token.newline_before => return,
                _ if self.is_opener() => self.skip_balanced(),
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------------

    /// Number of tokens forming a field label (markers included) when the
    /// current position starts a field, `None` otherwise.
    fn field_label_len(&self) -> Option<usize> {
        self.field_label_len_at(self.current)
    }

    fn field_label_len_at(&self, start: usize) -> Option<usize> {
        let first = self.token_at(start);
        let mut len = match first.kind {
            TokenKind::Ident | TokenKind::String => 1,
            TokenKind::LBracket | TokenKind::LParen => self.balanced_len_at(start)?,
            _ => return None,
        };
        let marker = self.token_at(start + len);
        if marker.is_operator("?") || marker.is_operator("!") {
            len += 1;
        }
        self.token_at(start + len).is(TokenKind::Colon).then_some(len)
    }

    fn parse_field(&mut self, label_len: usize) -> Node {
        let label_tokens: Vec<Token> = (0..label_len).map(|_| self.advance()).collect();
        let label = make_label(&label_tokens);
        let colon = self.advance();

        let value = if self.at_value_end() {
            let name = label.name().unwrap_or("?").to_string();
            self.report(format!("missing value for `{name}`"), colon.span.end);
            Node::Missing(Span::point(colon.span.end))
        } else if let Some(inner_len) = self.field_label_len() {
            // `a: b: 1` on one line nests `b` in an implicit record.
            let at = self.peek().span.start;
            if self.descend(at) {
                let inner = self.parse_field(inner_len);
                self.depth -= 1;
                self.built += 1;
                Node::Record(Record {
                    span: inner.span(),
                    elements: vec![inner],
                })
            } else {
                Node::Missing(Span::point(at))
            }
        } else {
            match self.parse_expression() {
                Some(node) => node,
                None => {
                    let token = self.peek().clone();
                    self.report(
                        format!("expected a value, found `{}`", token.text),
                        token.span.start,
                    );
                    Node::Missing(Span::point(token.span.start))
                }
            }
        };

        self.built += 1;
        Node::Field(Field {
            span: label.span().to(value.span()),
            label,
            value: Box::new(value),
        })
    }

    /// A value cannot start here: separator, closer, or a new field on the next line.
    fn at_value_end(&self) -> bool {
        let token = self.peek();
        match token.kind {
            TokenKind::Comma
            | TokenKind::RBrace
            | TokenKind::RBracket
            | TokenKind::RParen
            | TokenKind::Eof => true,
            _ => token.newline_before && self.field_label_len().is_some(),
        }
    }

    // ------------------------------------------------------------------------
    // Comprehensions
    // ------------------------------------------------------------------------

    fn at_comprehension(&self) -> bool {
        (self.at_keyword("for") || self.at_keyword("if") || self.at_keyword("let"))
            && self.field_label_len().is_none()
    }

    fn parse_comprehension(&mut self) -> Option<Node> {
        let keyword = self.advance();
        if keyword.text == "let" {
            // let name = value
            if self.check(TokenKind::Ident) {
                self.advance();
            }
            if self.peek().is_operator("=") {
                self.advance();
            }
            let value = self.parse_expression()?;
            return Some(Node::Expression(Expression {
                span: keyword.span.to(value.span()),
                operands: vec![value],
            }));
        }

        // Clauses run up to the body record.
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::LBrace => break,
                TokenKind::RBrace | TokenKind::Eof => {
                    self.report(
                        format!("`{}` clause without a body", keyword.text),
                        keyword.span.start,
                    );
                    return Some(Node::Missing(keyword.span));
                }
                _ if token.newline_before => {
                    self.report(
                        format!("`{}` clause without a body", keyword.text),
                        keyword.span.start,
                    );
                    return Some(Node::Missing(keyword.span));
                }
                TokenKind::LParen | TokenKind::LBracket => self.skip_balanced(),
                _ => {
                    self.advance();
                }
            }
        }
        self.parse_record()
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn parse_expression(&mut self) -> Option<Node> {
        let first = self.parse_unary()?;
        let mut operands = vec![first];

        loop {
            let token = self.peek();
            let is_binary = BINARY_OPERATORS.contains(&token.text.as_str())
                || LOGICAL_OPERATORS.contains(&token.text.as_str());
            if token.kind != TokenKind::Operator || !is_binary || token.newline_before {
                break;
            }
            let operator = self.advance();
            match self.parse_unary() {
                Some(rhs) => operands.push(rhs),
                None => {
                    self.report(
                        format!("missing operand after `{}`", operator.text),
                        operator.span.end,
                    );
                    operands.push(Node::Missing(Span::point(operator.span.end)));
                    break;
                }
            }
        }

        if operands.len() == 1 {
            return operands.pop();
        }
        let span = operands[0].span().to(operands[operands.len() - 1].span());
        Some(Node::Expression(Expression { span, operands }))
    }

    /// A run of prefix operators wraps its operand once.
    fn parse_unary(&mut self) -> Option<Node> {
        let mut first: Option<Token> = None;
        let mut last: Option<Token> = None;
        while self.peek().kind == TokenKind::Operator
            && PREFIX_OPERATORS.contains(&self.peek().text.as_str())
        {
            let operator = self.advance();
            first.get_or_insert_with(|| operator.clone());
            last = Some(operator);
        }
        let (Some(first), Some(last)) = (first, last) else {
            return self.parse_postfix();
        };

        let operand = match self.parse_postfix() {
            Some(node) => node,
            None => {
                self.report(
                    format!("missing operand after `{}`", last.text),
                    last.span.end,
                );
                Node::Missing(Span::point(last.span.end))
            }
        };
        Some(Node::Expression(Expression {
            span: first.span.to(operand.span()),
            operands: vec![operand],
        }))
    }

    /// Selectors and call or index groups extend one flat expression.
    fn parse_postfix(&mut self) -> Option<Node> {
        let head = self.parse_primary()?;
        let mut span = head.span();
        let mut operands = vec![head];
        let mut extended = false;
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Dot => {
                    self.advance();
                    let selector = self.peek();
                    if selector.is(TokenKind::Ident) || selector.is(TokenKind::String) {
                        let selector = self.advance();
                        span = span.to(selector.span);
                        extended = true;
                    } else {
                        let at = selector.span.start;
                        self.report("expected a selector after `.`", at);
                        break;
                    }
                }
                TokenKind::LParen | TokenKind::LBracket if !token.newline_before => {
                    let group = self.parse_group()?;
                    span = span.to(group.span());
                    operands.push(group);
                    extended = true;
                }
                _ => break,
            }
        }
        if !extended {
            return operands.pop();
        }
        Some(Node::Expression(Expression { span, operands }))
    }

    fn parse_primary(&mut self) -> Option<Node> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::LBrace => self.parse_record(),
            TokenKind::LBracket | TokenKind::LParen => self.parse_group(),
            TokenKind::String => {
                self.advance();
                Some(literal(LiteralKind::String, token))
            }
            TokenKind::Number => {
                self.advance();
                Some(literal(LiteralKind::Number, token))
            }
            TokenKind::Ident => {
                self.advance();
                Some(match token.text.as_str() {
                    "true" | "false" => literal(LiteralKind::Bool, token),
                    "null" => literal(LiteralKind::Null, token),
                    _ => Node::Identifier(Identifier {
                        span: token.span,
                        name: token.text,
                    }),
                })
            }
            TokenKind::Ellipsis => {
                self.advance();
                let next = self.peek();
                let typed = !next.newline_before
                    && !matches!(
                        next.kind,
                        TokenKind::Comma
                            | TokenKind::RBrace
                            | TokenKind::RBracket
                            | TokenKind::Eof
                    );
                let operand = if typed && self.descend(token.span.start) {
                    let operand = self.parse_unary();
                    self.depth -= 1;
                    operand
                } else {
                    None
                };
                Some(match operand {
                    Some(operand) => Node::Expression(Expression {
                        span: token.span.to(operand.span()),
                        operands: vec![operand],
                    }),
                    None => Node::Identifier(Identifier {
                        span: token.span,
                        name: token.text,
                    }),
                })
            }
            TokenKind::Error => {
                self.advance();
                Some(Node::Missing(token.span))
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Records, lists and groups
    // ------------------------------------------------------------------------

    fn parse_record(&mut self) -> Option<Node> {
        let open = self.peek().clone();
        if !self.enter(&open) {
            return Some(Node::Missing(open.span));
        }
        self.advance();

        let elements = self.parse_elements(true);
        let end = if self.check(TokenKind::RBrace) {
            self.advance().span.end
        } else {
            let end = self.eof_position();
            self.report(
                format!(
                    "record opened at {}:{} is never closed",
                    open.span.start.line, open.span.start.column
                ),
                end,
            );
            end
        };

        self.depth -= 1;
        self.built += 1;
        Some(Node::Record(Record {
            span: Span::new(open.span.start, end),
            elements,
        }))
    }

    /// `[ ... ]` lists and `( ... )` groups or call arguments.
    fn parse_group(&mut self) -> Option<Node> {
        let open = self.peek().clone();
        if !self.enter(&open) {
            return Some(Node::Missing(open.span));
        }
        self.advance();
        let close = if open.is(TokenKind::LBracket) {
            TokenKind::RBracket
        } else {
            TokenKind::RParen
        };

        let mut items = Vec::new();
        let end = loop {
            while self.check(TokenKind::Comma) {
                self.advance();
            }
            let token = self.peek().clone();
            if token.kind == close {
                self.advance();
                break token.span.end;
            }
            if matches!(token.kind, TokenKind::Eof | TokenKind::RBrace) {
                self.report(
                    format!(
                        "`{}` opened at {}:{} is never closed",
                        open.text, open.span.start.line, open.span.start.column
                    ),
                    token.span.start,
                );
                break token.span.start;
            }

            let item = if self.at_comprehension() {
                self.parse_comprehension()
            } else if let Some(label_len) = self.field_label_len() {
                // `[string]: T` patterns and `[Name=_]` aliases end up here.
                Some(self.parse_field(label_len))
            } else {
                self.parse_expression()
            };
            match item {
                Some(node) => items.push(node),
                None => {
                    self.report(format!("unexpected `{}`", token.text), token.span.start);
                    self.advance();
                }
            }
        };

        self.depth -= 1;
        let span = Span::new(open.span.start, end);
        if close == TokenKind::RBracket {
            self.built += 1;
            Some(Node::List(List { span, items }))
        } else {
            Some(Node::Expression(Expression {
                span,
                operands: items,
            }))
        }
    }

    /// Enters a nesting level, skipping the whole group when too deep.
    fn enter(&mut self, open: &Token) -> bool {
        if !self.descend(open.span.start) {
            self.skip_balanced();
            return false;
        }
        true
    }

    /// Takes one level of the nesting budget. Callers release it with
    /// `self.depth -= 1`.
    fn descend(&mut self, at: Position) -> bool {
        if self.depth >= MAX_NESTING_DEPTH {
            self.report("nesting too deep; skipping", at);
            return false;
        }
        self.depth += 1;
        true
    }

    // ------------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------------

    fn token_at(&self, index: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[index.min(last)]
    }

    fn peek(&self) -> &Token {
        self.token_at(self.current)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.token_at(self.current + offset)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().is(kind)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        let token = self.peek();
        token.is(TokenKind::Ident) && token.text == keyword
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.current += 1;
        }
        token
    }

    fn eof_position(&self) -> Position {
        self.token_at(self.tokens.len()).span.end
    }

    fn is_opener(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen
        )
    }

    /// Token count of the bracketed group starting at `start`, closer included.
    fn balanced_len_at(&self, start: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut index = start;
        loop {
            let token = self.token_at(index);
            match token.kind {
                TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen => depth += 1,
                TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(index - start + 1);
                    }
                }
                TokenKind::Eof => return None,
                _ => {}
            }
            index += 1;
        }
    }

    fn skip_balanced(&mut self) {
        match self.balanced_len_at(self.current) {
            Some(len) => {
                for _ in 0..len {
                    self.advance();
                }
            }
            None => {
                while !self.check(TokenKind::Eof) {
                    self.advance();
                }
            }
        }
    }

    fn report(&mut self, message: impl Into<String>, at: Position) {
        let message = message.into();
        debug!(line = at.line, column = at.column, "recovering: {message}");
        self.diagnostics
            .push(Advisory::recoverable_syntax(message, Some(at)));
    }
}

fn literal(kind: LiteralKind, token: Token) -> Node {
    Node::Literal(Literal {
        span: token.span,
        kind,
        raw: token.text,
    })
}

fn make_label(tokens: &[Token]) -> Label {
    let span = match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => first.span.to(last.span),
        _ => Span::default(),
    };
    match tokens {
        [token] | [token, _] if token.is(TokenKind::String) && !token.text.contains("\\(") => {
            Label::Quoted {
                raw: token.text.clone(),
                span: token.span,
            }
        }
        [token] | [token, _] if token.is(TokenKind::Ident) => Label::Identifier {
            name: token.text.clone(),
            span: token.span,
        },
        _ => Label::Other {
            text: tokens.iter().map(|t| t.text.as_str()).collect(),
            span,
        },
    }
}
