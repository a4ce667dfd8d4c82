//! Handles all user-facing output for the CLI.
//!
//! Everything is written through [`WriteColor`] so commands print colored
//! output to a terminal and plain text to a pipe or a test buffer.

use std::io::{self, Write};

use serde::Serialize;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::catalog::BuilderCatalog;
use crate::diagnostics::Severity;
use crate::validate::Finding;

// ============================================================================
// CORE OUTPUT FUNCTIONS
// ============================================================================

/// Prints the findings of one document, prefixed with its path.
pub fn print_findings<W: WriteColor>(out: &mut W, path: &str, findings: &[Finding]) -> io::Result<()> {
    for finding in findings {
        out.set_color(ColorSpec::new().set_bold(true))?;
        write!(out, "{}:{}:{}: ", path, finding.line, finding.column)?;
        out.set_color(severity_color(finding.severity).set_bold(true))?;
        write!(out, "{}", finding.severity)?;
        out.reset()?;
        writeln!(out, ": {}", finding.message)?;

        if !finding.suggestions.is_empty() {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            writeln!(out, "  help: did you mean {}?", quoted(&finding.suggestions))?;
            out.reset()?;
        }
    }
    Ok(())
}

/// Prints the closing tally of a `check` run.
pub fn print_summary<W: WriteColor>(out: &mut W, documents: usize, errors: usize, warnings: usize) -> io::Result<()> {
    let color = if errors > 0 {
        Color::Red
    } else if warnings > 0 {
        Color::Yellow
    } else {
        Color::Green
    };
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    writeln!(
        out,
        "{} document(s) checked: {} error(s), {} warning(s)",
        documents, errors, warnings
    )?;
    out.reset()
}

/// Lists catalog definitions grouped by base name.
pub fn print_builders<W: WriteColor>(out: &mut W, catalog: &BuilderCatalog) -> io::Result<()> {
    for base in catalog.base_names() {
        out.set_color(ColorSpec::new().set_bold(true))?;
        writeln!(out, "{base}")?;
        out.reset()?;

        for definition in catalog.candidates(base) {
            let range = definition.version_spec.as_deref().unwrap_or("(never matches)");
            write!(out, "  {:<32} ", definition.name)?;
            out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            write!(out, "{range:<24}")?;
            out.reset()?;
            writeln!(out, " {} parameter(s)", definition.parameters.len())?;
        }
    }

    for issue in catalog.issues() {
        out.set_color(&severity_color(Severity::Warning))?;
        write!(out, "warning")?;
        out.reset()?;
        writeln!(out, ": {}: {}", issue.builder, issue.message)?;
    }

    writeln!(out, "default version: {}", catalog.default_version())
}

/// Pretty-prints a value as JSON on its own line.
pub fn print_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn severity_color(severity: Severity) -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Info => Color::Blue,
    }));
    spec
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("`{name}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BuilderDefinition;
    use termcolor::Buffer;

    #[test]
    fn builders_are_listed_by_base_name() {
        let catalog = BuilderCatalog::new(
            [
                BuilderDefinition::new("pack_v0_1_0", Some("==0.1.0"), vec![]).unwrap(),
                BuilderDefinition::new("pack", Some(">=0.2.0"), vec![]).unwrap(),
            ],
            "0.2.0",
        );
        let mut buffer = Buffer::no_color();
        print_builders(&mut buffer, &catalog).unwrap();
        let text = String::from_utf8(buffer.into_inner()).unwrap();

        assert!(text.starts_with("pack\n"));
        assert!(text.contains("pack_v0_1_0"));
        assert!(text.contains(">=0.2.0"));
        assert!(text.ends_with("default version: 0.2.0\n"));
    }

    #[test]
    fn catalog_issues_are_listed_as_warnings() {
        let catalog = crate::catalog::parse_catalog(
            r#"{"builders": [{"name": "broken", "version_spec": ">>1"}], "default_version": "1.0.0"}"#,
        )
        .unwrap();
        let mut buffer = Buffer::no_color();
        print_builders(&mut buffer, &catalog).unwrap();
        let text = String::from_utf8(buffer.into_inner()).unwrap();

        assert!(text.contains(">>1"));
        assert!(text.contains("warning: broken: "));
    }

    #[test]
    fn summary_counts() {
        let mut buffer = Buffer::no_color();
        print_summary(&mut buffer, 2, 1, 0).unwrap();
        assert_eq!(
            String::from_utf8(buffer.into_inner()).unwrap(),
            "2 document(s) checked: 1 error(s), 0 warning(s)\n"
        );
    }
}
