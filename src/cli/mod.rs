//! The buildscope Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions. Failures are rendered as miette reports on
//! stderr and end the process with exit code 1.

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use miette::{Diagnostic, IntoDiagnostic, Report};
use serde::Serialize;
use termcolor::{ColorChoice, StandardStream};
use thiserror::Error;
use tracing::{debug, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use crate::catalog::{load_catalog, resolve_with};
use crate::cli::args::{BuildscopeArgs, Command};
use crate::config::EngineConfig;
use crate::scanner::{scan_or_empty, scanner_from_config};
use crate::scope::ScopeReport;
use crate::validate::Validator;

pub mod args;
pub mod output;

/// Extension of documents picked up when walking a directory.
const DOCUMENT_EXTENSION: &str = "cue";

/// Outcomes that fail a command after its output has been printed.
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("failed to read document `{path}`")]
    #[diagnostic(code(buildscope::cli::read))]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{count} document(s) could not be scanned")]
    #[diagnostic(code(buildscope::cli::scan_failed))]
    ScanFailed { count: usize },

    #[error("check failed with {errors} error(s)")]
    #[diagnostic(code(buildscope::cli::check_failed))]
    CheckFailed { errors: usize },
}

/// The main entry point for the CLI.
pub fn run() {
    let args = BuildscopeArgs::parse();
    init_tracing(args.verbose);

    let result = load_config(args.config.as_deref()).and_then(|config| {
        // Dispatch to the appropriate subcommand handler.
        match args.command {
            Command::Scan { paths } => handle_scan(&config, &paths),
            Command::Resolve {
                catalog,
                name,
                version,
            } => handle_resolve(&config, &catalog, &name, version.as_deref()),
            Command::Check { catalog, paths } => handle_check(&config, &catalog, &paths),
            Command::Builders { catalog } => handle_builders(&catalog),
        }
    });

    if let Err(report) = result {
        eprintln!("{report:?}");
        process::exit(1);
    }
}

/// Installs the stderr subscriber. `-v` flags win over `RUST_LOG`.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new(Level::INFO.to_string()),
        2 => EnvFilter::new(Level::DEBUG.to_string()),
        _ => EnvFilter::new(Level::TRACE.to_string()),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Colors only when stdout is a terminal.
fn color_choice() -> ColorChoice {
    if io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn load_config(path: Option<&Path>) -> miette::Result<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

/// Per-file entry of `scan` output.
#[derive(Serialize)]
struct ScannedDocument<'a> {
    path: &'a str,
    #[serde(flatten)]
    report: &'a ScopeReport,
}

/// Handles the `scan` subcommand.
fn handle_scan(config: &EngineConfig, paths: &[PathBuf]) -> miette::Result<()> {
    let scanner = scanner_from_config(config);
    let mut stdout = io::stdout().lock();

    // Bare stdin-to-stdout mode: one report, no path wrapper.
    if paths.is_empty() || paths.iter().all(|p| p.as_os_str() == "-") {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source).into_diagnostic()?;
        let report = scan_or_empty(scanner.as_ref(), &source)?;
        return output::print_json(&mut stdout, &report).into_diagnostic();
    }

    let mut failed = 0;
    for path in collect_documents(paths) {
        let display = path.display().to_string();
        match read_document(&path).and_then(|source| {
            scan_or_empty(scanner.as_ref(), &source).map_err(Report::new)
        }) {
            Ok(report) => {
                let entry = ScannedDocument {
                    path: &display,
                    report: &report,
                };
                output::print_json(&mut stdout, &entry).into_diagnostic()?;
            }
            Err(report) => {
                failed += 1;
                eprintln!("{:?}", report.wrap_err(display));
            }
        }
    }

    match failed {
        0 => Ok(()),
        count => Err(CliError::ScanFailed { count }.into()),
    }
}

/// Handles the `resolve` subcommand.
fn handle_resolve(
    config: &EngineConfig,
    catalog: &Path,
    name: &str,
    version: Option<&str>,
) -> miette::Result<()> {
    let catalog = load_catalog(catalog)?;
    let definition = resolve_with(&catalog, name, version, &config.suggestions)?;
    debug!(builder = %name, resolved = %definition.name, "resolved");
    output::print_json(&mut io::stdout().lock(), definition.as_ref()).into_diagnostic()
}

/// Handles the `check` subcommand.
fn handle_check(config: &EngineConfig, catalog: &Path, paths: &[PathBuf]) -> miette::Result<()> {
    let catalog = load_catalog(catalog)?;
    let scanner = scanner_from_config(config);
    let validator = Validator::with_config(&catalog, config);
    let mut stdout = StandardStream::stdout(color_choice());

    let documents = collect_documents(paths);
    let (mut errors, mut warnings) = (0, 0);
    for path in &documents {
        let display = path.display().to_string();
        let source = read_document(path)?;
        let report = match scan_or_empty(scanner.as_ref(), &source) {
            Ok(report) => report,
            Err(err) => {
                errors += 1;
                eprintln!("{:?}", Report::new(err).wrap_err(display));
                continue;
            }
        };

        let findings = validator.validate(&report)?;
        errors += findings.iter().filter(|f| f.is_error()).count();
        warnings += findings.iter().filter(|f| !f.is_error()).count();
        output::print_findings(&mut stdout, &display, &findings).into_diagnostic()?;
    }
    output::print_summary(&mut stdout, documents.len(), errors, warnings).into_diagnostic()?;

    match errors {
        0 => Ok(()),
        errors => Err(CliError::CheckFailed { errors }.into()),
    }
}

/// Handles the `builders` subcommand.
fn handle_builders(catalog: &Path) -> miette::Result<()> {
    let catalog = load_catalog(catalog)?;
    let mut stdout = StandardStream::stdout(color_choice());
    output::print_builders(&mut stdout, &catalog).into_diagnostic()
}

// ============================================================================
// DOCUMENT DISCOVERY
// ============================================================================

/// Explicit files are taken as given; directories are walked for documents.
fn collect_documents(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut documents = Vec::new();
    for path in paths {
        if !path.is_dir() {
            documents.push(path.clone());
            continue;
        }
        documents.extend(
            WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some(DOCUMENT_EXTENSION))
                .map(|e| e.into_path()),
        );
    }
    if documents.is_empty() {
        warn!("no documents found");
    }
    documents
}

fn read_document(path: &Path) -> miette::Result<String> {
    fs::read_to_string(path).map_err(|source| {
        Report::new(CliError::Read {
            path: path.display().to_string(),
            source,
        })
    })
}
