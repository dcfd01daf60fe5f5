//! Task report rendering.
//!
//! stdout carries the task's own output (one line per event, or the whole
//! report as JSON with `--json`); warnings go to stderr so scripted callers
//! can pipe the results cleanly.

use anyhow::Result;
use owo_colors::OwoColorize;
use vstamp_core::task::TaskReport;

/// Print the report.
///
/// Text mode prints `<src> : <version>` per event (just the version for
/// literal-mode validate) and a yellow warning line per skipped file.
pub fn render(report: &TaskReport, json: bool, quiet: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for event in &report.events {
        match event.src {
            Some(ref src) => println!("{} : {}", src.as_str().cyan(), event.version.green()),
            None => println!("{}", event.version.green()),
        }
    }

    if !quiet {
        for warning in &report.warnings {
            match warning.src {
                Some(ref src) => eprintln!(
                    "{} {}: {}",
                    "warning:".yellow().bold(),
                    src.as_str().cyan(),
                    warning.message
                ),
                None => eprintln!("{} {}", "warning:".yellow().bold(), warning.message),
            }
        }
    }

    Ok(())
}
