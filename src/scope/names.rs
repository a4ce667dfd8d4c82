//! Field-name classification.

use crate::config::TagConfig;

/// How a direct field of a context-bearing record is treated.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldClass {
    /// Type tag, version tag or mode marker.
    Reserved,
    /// `_hidden` and `#Definition` fields.
    Private,
    /// Fails the identifier grammar; dropped with an advisory.
    Invalid,
    Parameter,
}

pub fn classify(name: &str, tags: &TagConfig) -> FieldClass {
    if tags.is_reserved(name) {
        FieldClass::Reserved
    } else if name.starts_with('_') || name.starts_with('#') {
        FieldClass::Private
    } else if is_identifier(name) {
        FieldClass::Parameter
    } else {
        FieldClass::Invalid
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
