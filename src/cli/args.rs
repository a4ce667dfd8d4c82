//! Defines the command-line arguments and subcommands for the buildscope CLI.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "buildscope",
    version,
    about = "Scope builder invocations in CUE-style specs and resolve them against a builder catalog."
)]
pub struct BuildscopeArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). Overrides RUST_LOG.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Engine configuration file (.yaml, .yml or .json).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the scope report of each document as JSON. Reads stdin when no path is given.
    Scan {
        /// Documents or directories (walked for *.cue files). `-` is stdin.
        paths: Vec<PathBuf>,
    },
    /// Resolve a builder name and version to one catalog definition.
    Resolve {
        /// The catalog JSON file.
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,
        /// Builder name, with or without a generated version suffix.
        name: String,
        /// Requested version; the catalog default when omitted.
        #[arg(long)]
        version: Option<String>,
    },
    /// Validate documents against a catalog and report findings.
    Check {
        /// The catalog JSON file.
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,
        /// Documents or directories (walked for *.cue files).
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List catalog definitions with their version ranges.
    Builders {
        /// The catalog JSON file.
        #[arg(long, value_name = "FILE")]
        catalog: PathBuf,
    },
}
