//! Context extraction.
//!
//! A pre-order walk over the document tree. Every record whose direct fields
//! include a non-empty type tag becomes a context; records without one are
//! walked through so that typed records nested below them are still found.

use crate::config::TagConfig;
use crate::scope::Context;
use crate::syntax::{Node, Position, Record};

/// A context together with the record it was read from.
#[derive(Debug, Clone)]
pub struct ExtractedContext<'a> {
    pub context: Context,
    pub record: &'a Record,
    /// Nearest enclosing context, as an index into the extraction output.
    pub parent: Option<usize>,
    pub tag_position: Position,
}

/// Finds every context under `root`, in document order.
pub fn extract_contexts<'a>(root: &'a Record, tags: &TagConfig) -> Vec<ExtractedContext<'a>> {
    let mut out = Vec::new();
    visit_record(root, None, tags, &mut out);
    out
}

fn visit_node<'a>(
    node: &'a Node,
    enclosing: Option<usize>,
    tags: &TagConfig,
    out: &mut Vec<ExtractedContext<'a>>,
) {
    match node {
        Node::Record(record) => visit_record(record, enclosing, tags, out),
        Node::Field(field) => visit_node(&field.value, enclosing, tags, out),
        Node::List(list) => {
            for item in &list.items {
                visit_node(item, enclosing, tags, out);
            }
        }
        Node::Expression(expr) => {
            for operand in &expr.operands {
                visit_node(operand, enclosing, tags, out);
            }
        }
        Node::Literal(_) | Node::Identifier(_) | Node::Missing(_) => {}
    }
}

fn visit_record<'a>(
    record: &'a Record,
    enclosing: Option<usize>,
    tags: &TagConfig,
    out: &mut Vec<ExtractedContext<'a>>,
) {
    let mut scope = enclosing;
    if let Some(tag) = read_tags(record, tags) {
        out.push(ExtractedContext {
            context: Context {
                type_name: tag.type_name,
                version: tag.version,
                version_tagged: Some(tag.version_tagged),
                line: tag.position.line,
                column: tag.position.column,
                start_line: record.span.start.line,
                end_line: record.span.end.line.max(record.span.start.line),
            },
            record,
            parent: enclosing,
            tag_position: tag.position,
        });
        scope = Some(out.len() - 1);
    }

    for element in &record.elements {
        visit_node(element, scope, tags, out);
    }
}

struct Tag {
    type_name: String,
    version: String,
    version_tagged: bool,
    position: Position,
}

/// Reads the type and version tags of `record`. Later duplicates win.
fn read_tags(record: &Record, tags: &TagConfig) -> Option<Tag> {
    let mut type_tag: Option<(&str, Position)> = None;
    let mut version: Option<&str> = None;

    for field in record.fields() {
        let Some(name) = field.label.name() else {
            continue;
        };
        if name == tags.type_tag {
            type_tag = literal_text(&field.value).map(|text| (text, field.label.span().start));
        } else if name == tags.version_tag {
            version = literal_text(&field.value);
        }
    }

    let (type_name, position) = type_tag.filter(|(text, _)| !text.trim().is_empty())?;
    let version = version.map(str::trim).filter(|v| !v.is_empty());

    Some(Tag {
        type_name: type_name.trim().to_string(),
        version: version.unwrap_or(tags.default_version.as_str()).to_string(),
        version_tagged: version.is_some(),
        position,
    })
}

fn literal_text(node: &Node) -> Option<&str> {
    match node {
        Node::Literal(literal) => Some(literal.text()),
        _ => None,
    }
}
