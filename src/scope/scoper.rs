//! Parameter scoping: direct fields of each context-bearing record.

use tracing::warn;

use crate::config::TagConfig;
use crate::diagnostics::Advisory;
use crate::scope::extractor::ExtractedContext;
use crate::scope::names::{classify, FieldClass};
use crate::scope::{Parameter, ValueKind};
use crate::syntax::{Field, Label};

/// Assigns the direct fields of every extracted context to their owner.
///
/// Returns the parameters in document order plus the advisories raised for
/// labels that cannot name a parameter.
pub fn scope_parameters(
    contexts: &[ExtractedContext<'_>],
    tags: &TagConfig,
) -> (Vec<Parameter>, Vec<Advisory>) {
    let mut parameters = Vec::new();
    let mut advisories = Vec::new();

    for (index, extracted) in contexts.iter().enumerate() {
        for field in extracted.record.fields() {
            let name = match &field.label {
                Label::Quoted { .. } | Label::Identifier { .. } => match field.label.name() {
                    Some(name) => name,
                    None => continue,
                },
                Label::Other { text, span } => {
                    advisories.push(Advisory::unsupported_label(text, span.start));
                    continue;
                }
            };

            match classify(name, tags) {
                FieldClass::Reserved | FieldClass::Private => continue,
                FieldClass::Invalid => {
                    let at = field.label.span().start;
                    warn!(field = %name, line = at.line, column = at.column, "skipping invalid parameter name");
                    advisories.push(Advisory::invalid_parameter_name(name, Some(at)));
                    continue;
                }
                FieldClass::Parameter => {}
            }

            let Some(owner) = owner_of_field(contexts, index, field) else {
                continue;
            };
            let context = &contexts[owner].context;
            let at = field.label.span().start;
            parameters.push(Parameter {
                name: name.to_string(),
                line: at.line,
                column: at.column,
                context_type: context.type_name.clone(),
                context_version: context.version.clone(),
                value_kind: ValueKind::of(&field.value),
                context_index: Some(owner),
            });
        }
    }

    parameters.sort_by_key(|p| (p.line, p.column));
    (parameters, advisories)
}

/// A field written on the tag's line, left of the tag, belongs to the
/// enclosing context.
fn owner_of_field(contexts: &[ExtractedContext<'_>], index: usize, field: &Field) -> Option<usize> {
    let extracted = &contexts[index];
    let at = field.label.span().start;
    let tag = extracted.tag_position;
    if at.line == tag.line && at.column < tag.column {
        extracted.parent
    } else {
        Some(index)
    }
}
