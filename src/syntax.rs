//! Syntax tree for record-literal configuration documents.
//!
//! Documents are CUE-style: nested records of `label: value` fields, lists,
//! literals and references. The tree is produced by a [`StructuralParser`]
//! and never mutated afterwards; every node carries the [`Span`] it was built
//! from.
//!
//! Absent children are represented by [`Node::Missing`] so that consumers
//! have to handle partial trees explicitly.

use serde::{Deserialize, Serialize};

pub mod lexer;
pub mod parser;

pub use parser::{parse_document, ParsedDocument, RecordParser, StructuralParser};

// ============================================================================
// SOURCE POSITIONS
// ============================================================================

/// A 1-based line/column position. Columns count characters, not bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Represents a span in the source code. `end` is exclusive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Zero-width span at a single position.
    pub const fn point(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// Span from the start of `self` to the end of `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end.max(self.start),
        }
    }
}

// ============================================================================
// TREE NODES
// ============================================================================

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Record(Record),
    Field(Field),
    List(List),
    Literal(Literal),
    Identifier(Identifier),
    /// Operator chains, selectors, calls and comprehensions. Operands stay
    /// reachable so records nested inside them are still discovered.
    Expression(Expression),
    /// A child the parser expected but could not build.
    Missing(Span),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Record(record) => record.span,
            Node::Field(field) => field.span,
            Node::List(list) => list.span,
            Node::Literal(literal) => literal.span,
            Node::Identifier(ident) => ident.span,
            Node::Expression(expr) => expr.span,
            Node::Missing(span) => *span,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Node::Record(record) => Some(record),
            _ => None,
        }
    }
}

/// A `{ ... }` record literal, or the implicit record of a whole document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub span: Span,
    pub elements: Vec<Node>,
}

impl Record {
    /// Direct field children, in document order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.elements.iter().filter_map(|element| match element {
            Node::Field(field) => Some(field),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub span: Span,
    pub label: Label,
    pub value: Box<Node>,
}

/// The label of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    /// `"name": ...`; `raw` keeps the quotes.
    Quoted { raw: String, span: Span },
    /// `name: ...`, `#Def: ...`, `_hidden: ...`; optional `?`/`!` markers are dropped.
    Identifier { name: String, span: Span },
    /// Pattern constraints, parenthesized or interpolated labels.
    Other { text: String, span: Span },
}

impl Label {
    pub fn span(&self) -> Span {
        match self {
            Label::Quoted { span, .. } | Label::Identifier { span, .. } | Label::Other { span, .. } => {
                *span
            }
        }
    }

    /// The field name, when the label has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Label::Quoted { raw, .. } => Some(unquote(raw)),
            Label::Identifier { name, .. } => Some(name.as_str()),
            Label::Other { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub span: Span,
    pub items: Vec<Node>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LiteralKind {
    String,
    Number,
    Bool,
    Null,
}

/// A literal value. `raw` is the source text, quotes included.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub span: Span,
    pub kind: LiteralKind,
    pub raw: String,
}

impl Literal {
    /// The literal text with surrounding quoting removed.
    pub fn text(&self) -> &str {
        unquote(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub span: Span,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub span: Span,
    pub operands: Vec<Node>,
}

// ============================================================================
// UTILITIES
// ============================================================================

/// Strips the quoting of a string token: `"x"`, `'x'`, `"""x"""` and the
/// `#"x"#` raw forms. Anything else is returned unchanged.
pub fn unquote(raw: &str) -> &str {
    let hashes = raw.len() - raw.trim_start_matches('#').len();
    let inner = if hashes > 0
        && raw.len() >= 2 * hashes
        && raw[raw.len() - hashes..].bytes().all(|b| b == b'#')
    {
        &raw[hashes..raw.len() - hashes]
    } else {
        raw
    };
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if inner.len() >= 2 * quote.len() && inner.starts_with(quote) && inner.ends_with(quote) {
            return &inner[quote.len()..inner.len() - quote.len()];
        }
    }
    raw
}
