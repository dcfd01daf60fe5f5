//! Library interface for the `vstamp` CLI.
//!
//! This crate exposes the CLI's argument parser as a library, primarily for
//! documentation generation and testing. The actual entry point is in
//! `main.rs`.
//!
//! # Structure
//!
//! - [`Cli`] - The root argument parser (clap derive)
//! - [`output`] - Task report rendering
//!
//! # Documentation Generation
//!
//! The [`command()`] function returns the clap `Command` for generating man
//! pages and shell completions via `xtask`.

pub mod output;

use clap::{CommandFactory, Parser};
use std::path::PathBuf;

/// Color output preference.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect terminal capabilities automatically.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

impl ColorChoice {
    /// Configure global color output based on this choice.
    ///
    /// Call this once at startup to set the color mode.
    pub fn apply(self) {
        match self {
            Self::Auto => {} // owo-colors auto-detects by default
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }
}

const ENV_HELP: &str = "\
ENVIRONMENT VARIABLES:
    RUST_LOG               Log filter (e.g., debug, vstamp=trace)
    VSTAMP_LOG_PATH        Explicit log file path
    VSTAMP_LOG_DIR         Log directory
";

const AFTER_HELP: &str = "\
PHASES:
    validate    Parse and report versions without writing
    set         Write a version into each manifest
    bump        Increment major, minor, patch, or prerelease
    strip       Clear prerelease or build identifiers
";

/// Command-line interface definition for vstamp.
#[derive(Parser)]
#[command(name = "vstamp")]
#[command(about = "Semantic version stamping for JSON manifests", long_about = None)]
#[command(version)]
#[command(after_help = AFTER_HELP)]
#[command(after_long_help = ENV_HELP)]
pub struct Cli {
    /// Phase to run: validate, set, bump, or strip
    pub phase: String,

    /// Version part (bump/strip) or literal version text (validate/set)
    pub part: Option<String>,

    /// Build metadata to append after '+'
    pub build: Option<String>,

    /// Manifest file to process (repeatable; overrides configured files)
    #[arg(short = 'f', long = "file", value_name = "SRC")]
    pub files: Vec<PathBuf>,

    /// Write output here instead of back to each source
    #[arg(long, value_name = "DEST")]
    pub dest: Option<PathBuf>,

    /// JSON indentation unit (default: one tab; '\t' and '\n' are understood)
    #[arg(long, value_name = "STR")]
    pub space: Option<String>,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run as if started in DIR
    #[arg(short = 'C', long)]
    pub chdir: Option<PathBuf>,

    /// Only print errors (suppresses warnings/info)
    #[arg(short, long)]
    pub quiet: bool,

    /// More detail (repeatable; e.g. -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Colorize output
    #[arg(long, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// Output the task report as JSON (for scripting)
    #[arg(long)]
    pub json: bool,
}

/// Translate the escape sequences a shell passes through literally.
///
/// `--space '\t'` arrives as a backslash and a `t`; config files express the
/// real characters directly, so only the CLI needs this.
pub fn unescape_space(raw: &str) -> String {
    raw.replace("\\t", "\t").replace("\\n", "\n")
}

/// Returns the clap command for documentation generation
pub fn command() -> clap::Command {
    Cli::command()
}
