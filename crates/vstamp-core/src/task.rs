//! Phase dispatch and per-file processing.
//!
//! One task invocation runs exactly one phase over a list of file
//! descriptors:
//!
//! 1. **Dispatch** ([`run`]) — resolve options, validate the phase name (and,
//!    for bump/strip, the part) before any file is opened.
//! 2. **Process** — each phase walks its `(src, dest)` pairs sequentially;
//!    every pair yields either an event or a warning in the returned
//!    [`TaskReport`], and a failure for one file never stops the next.
//!
//! The report is the event surface: each entry carries the `semver.<phase>`
//! event name plus the formatted version and paths, so an orchestrator can
//! react to outcomes without re-reading any file.

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::manifest::{Manifest, ManifestError};
use crate::options::{self, Options, OptionsConfig, TemplateContext};
use crate::version::{self, BumpLevel, StripPart, VersionError};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors from task execution.
///
/// `UnknownPhase` and `UnknownPart` are the only fatal variants; the rest
/// occur inside a file loop and surface as [`TaskWarning`]s instead of
/// aborting the invocation.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The requested phase is not one of validate/set/bump/strip.
    #[error("Unknown phase '{0}'")]
    UnknownPhase(String),

    /// The part is not valid for the requested phase.
    #[error("Unknown part '{0}'")]
    UnknownPart(String),

    /// Manifest I/O or structure failure.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Version parsing or increment failure.
    #[error(transparent)]
    Version(#[from] VersionError),
}

/// Result alias for task operations.
pub type TaskResult<T> = Result<T, TaskError>;

// ──────────────────────────────────────────────
// Task types
// ──────────────────────────────────────────────

/// Task phase, parsed from its user-supplied name by [`Phase::parse`] so an
/// unknown phase fails before any file is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Parse and report versions without writing anything.
    Validate,
    /// Write a version (explicit or re-canonicalized) into each manifest.
    Set,
    /// Increment a version part in each manifest.
    Bump,
    /// Clear the prerelease or build identifiers in each manifest.
    Strip,
}

impl Phase {
    /// Parse a phase name.
    pub fn parse(name: &str) -> TaskResult<Self> {
        match name {
            "validate" => Ok(Self::Validate),
            "set" => Ok(Self::Set),
            "bump" => Ok(Self::Bump),
            "strip" => Ok(Self::Strip),
            other => Err(TaskError::UnknownPhase(other.to_owned())),
        }
    }

    /// The phase name as invoked.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Set => "set",
            Self::Bump => "bump",
            Self::Strip => "strip",
        }
    }

    /// Event name announced for this phase's outcomes.
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Validate => "semver.validate",
            Self::Set => "semver.set",
            Self::Bump => "semver.bump",
            Self::Strip => "semver.strip",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `src → dest` file descriptor, post glob-resolution.
///
/// `dest = None` writes each source back to itself. When `dest` is set, every
/// source's output goes to that one path; with several sources the writes
/// land in order and the last one wins.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileSpec {
    /// Source manifest paths.
    pub src: Vec<Utf8PathBuf>,
    /// Destination path; each source writes back to itself when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<Utf8PathBuf>,
}

/// A successfully processed item, in the shape the task announces outcomes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskEvent {
    /// Event name (`semver.validate`, `semver.set`, ...).
    pub event: String,
    /// The formatted version that was produced.
    pub version: String,
    /// Source path; absent for literal-mode validate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<Utf8PathBuf>,
    /// Destination path; absent for validate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<Utf8PathBuf>,
}

/// A per-file failure. The file was left untouched.
#[derive(Debug, Clone, Serialize)]
pub struct TaskWarning {
    /// Source path, when the failure is tied to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<Utf8PathBuf>,
    /// The error message.
    pub message: String,
}

/// Everything one task invocation produced, in processing order.
#[derive(Debug, Serialize)]
pub struct TaskReport {
    /// The phase that ran.
    pub phase: Phase,
    /// One entry per successfully processed item.
    pub events: Vec<TaskEvent>,
    /// One entry per skipped file.
    pub warnings: Vec<TaskWarning>,
}

impl TaskReport {
    fn new(phase: Phase) -> Self {
        Self {
            phase,
            events: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn event(&mut self, version: String, src: Option<&Utf8Path>, dest: Option<&Utf8Path>) {
        info!(event = self.phase.event_name(), version = %version, src = ?src, dest = ?dest, "announced");
        self.events.push(TaskEvent {
            event: self.phase.event_name().to_owned(),
            version,
            src: src.map(Utf8Path::to_path_buf),
            dest: dest.map(Utf8Path::to_path_buf),
        });
    }

    fn warning(&mut self, src: Option<&Utf8Path>, err: &TaskError) {
        warn!(src = ?src, error = %err, "file skipped");
        self.warnings.push(TaskWarning {
            src: src.map(Utf8Path::to_path_buf),
            message: err.to_string(),
        });
    }
}

// ──────────────────────────────────────────────
// Dispatch
// ──────────────────────────────────────────────

/// Run one task invocation.
///
/// Resolves effective options (explicit arguments over `config_options` over
/// defaults, with `{% %}` template expansion), validates the phase and — for
/// bump/strip — the part, then processes each file with per-item isolation.
///
/// # Errors
///
/// Only `Unknown phase` / `Unknown part` are returned as errors, and both are
/// raised before any file I/O. Per-file failures land in the report's
/// `warnings` instead.
#[instrument(skip(config_options, files), fields(phase = phase_name))]
pub fn run(
    phase_name: &str,
    explicit_part: Option<&str>,
    explicit_build: Option<&str>,
    config_options: &OptionsConfig,
    files: &[FileSpec],
) -> TaskResult<TaskReport> {
    let phase = Phase::parse(phase_name)?;
    let opts = options::resolve(phase.as_str(), explicit_part, explicit_build, config_options);

    // Destination paths may template on the resolved context.
    let ctx = TemplateContext {
        phase: phase.as_str(),
        part: opts.part.as_deref(),
        build: opts.build.as_deref(),
    };
    let files: Vec<FileSpec> = files
        .iter()
        .map(|spec| FileSpec {
            src: spec.src.clone(),
            dest: spec
                .dest
                .as_ref()
                .map(|dest| Utf8PathBuf::from(options::expand(dest.as_str(), &ctx))),
        })
        .collect();

    debug!(%phase, part = ?opts.part, build = ?opts.build, files = files.len(), "dispatching");

    match phase {
        Phase::Validate => Ok(validate(&opts, &files)),
        Phase::Set => Ok(set(&opts, &files)),
        Phase::Bump => bump(&opts, &files),
        Phase::Strip => strip(&opts, &files),
    }
}

/// Flatten descriptors into `(src, effective dest)` pairs. A missing dest
/// writes each source back to itself.
fn iter_files(files: &[FileSpec]) -> impl Iterator<Item = (&Utf8Path, &Utf8Path)> {
    files.iter().flat_map(|spec| {
        spec.src.iter().map(move |src| {
            (
                src.as_path(),
                spec.dest.as_deref().unwrap_or_else(|| src.as_path()),
            )
        })
    })
}

/// Parse version text, splicing in explicit build metadata when present.
///
/// With a build argument the text is cleaned first, so stored build
/// identifiers are replaced rather than concatenated with the new ones.
fn reversion(text: &str, build: Option<&str>) -> TaskResult<Version> {
    let version = match build {
        Some(build) => version::parse_lenient(&format!("{}+{build}", version::clean(text)?))?,
        None => version::parse_lenient(text)?,
    };
    Ok(version)
}

// ──────────────────────────────────────────────
// Phase procedures
// ──────────────────────────────────────────────

fn validate(opts: &Options, files: &[FileSpec]) -> TaskReport {
    let mut report = TaskReport::new(Phase::Validate);

    // Literal mode: an explicit part is the version text itself; no files.
    if let Some(ref part) = opts.part {
        match reversion(part, opts.build.as_deref()) {
            Ok(version) => {
                report.event(version::format_version(&version), None, None);
            }
            Err(err) => report.warning(None, &err),
        }
        return report;
    }

    for (src, _) in iter_files(files) {
        match validate_one(src, opts) {
            Ok(formatted) => report.event(formatted, Some(src), None),
            Err(err) => report.warning(Some(src), &err),
        }
    }
    report
}

fn validate_one(src: &Utf8Path, opts: &Options) -> TaskResult<String> {
    let manifest = Manifest::read(src)?;
    let current = manifest.version()?;
    debug!(%src, version = current, "read manifest");
    let version = reversion(current, opts.build.as_deref())?;
    Ok(version::format_version(&version))
}

fn set(opts: &Options, files: &[FileSpec]) -> TaskReport {
    let mut report = TaskReport::new(Phase::Set);
    for (src, dest) in iter_files(files) {
        match set_one(src, dest, opts) {
            Ok(formatted) => report.event(formatted, Some(src), Some(dest)),
            Err(err) => report.warning(Some(src), &err),
        }
    }
    report
}

fn set_one(src: &Utf8Path, dest: &Utf8Path, opts: &Options) -> TaskResult<String> {
    let mut manifest = Manifest::read(src)?;
    let current = manifest.version()?.to_owned();
    match opts.part.as_deref() {
        Some(part) => debug!(%src, version = current, part, "read manifest (explicit part overrides)"),
        None => debug!(%src, version = current, "read manifest"),
    }

    let text = opts.part.as_deref().unwrap_or(&current);
    let version = reversion(text, opts.build.as_deref())?;
    let formatted = version::format_version(&version);

    manifest.set_version(&formatted);
    manifest.write(dest, &opts.space)?;
    Ok(formatted)
}

fn bump(opts: &Options, files: &[FileSpec]) -> TaskResult<TaskReport> {
    let part = opts.part.as_deref().unwrap_or_default();
    let level =
        BumpLevel::parse(part).ok_or_else(|| TaskError::UnknownPart(part.to_owned()))?;

    let mut report = TaskReport::new(Phase::Bump);
    for (src, dest) in iter_files(files) {
        match bump_one(src, dest, level, opts) {
            Ok(formatted) => report.event(formatted, Some(src), Some(dest)),
            Err(err) => report.warning(Some(src), &err),
        }
    }
    Ok(report)
}

fn bump_one(
    src: &Utf8Path,
    dest: &Utf8Path,
    level: BumpLevel,
    opts: &Options,
) -> TaskResult<String> {
    let mut manifest = Manifest::read(src)?;
    let current = manifest.version()?.to_owned();
    debug!(%src, version = current, %level, "read manifest");

    // Always clean before bumping: stale build metadata does not survive a
    // bump unless an explicit build argument reinstates some.
    let cleaned = version::clean(&current)?;
    let parsed = match opts.build.as_deref() {
        Some(build) => version::parse_lenient(&format!("{cleaned}+{build}"))?,
        None => version::parse_lenient(&cleaned)?,
    };
    let next = version::bump(&parsed, level)?;
    let formatted = version::format_version(&next);

    manifest.set_version(&formatted);
    manifest.write(dest, &opts.space)?;
    Ok(formatted)
}

fn strip(opts: &Options, files: &[FileSpec]) -> TaskResult<TaskReport> {
    let part = opts.part.as_deref().unwrap_or_default();
    let target =
        StripPart::parse(part).ok_or_else(|| TaskError::UnknownPart(part.to_owned()))?;

    let mut report = TaskReport::new(Phase::Strip);
    for (src, dest) in iter_files(files) {
        match strip_one(src, dest, target, opts) {
            Ok(formatted) => report.event(formatted, Some(src), Some(dest)),
            Err(err) => report.warning(Some(src), &err),
        }
    }
    Ok(report)
}

fn strip_one(
    src: &Utf8Path,
    dest: &Utf8Path,
    target: StripPart,
    opts: &Options,
) -> TaskResult<String> {
    let mut manifest = Manifest::read(src)?;
    let current = manifest.version()?.to_owned();
    debug!(%src, version = current, %target, "read manifest");

    // Strip parses the stored text as-is; no clean, no build injection.
    let mut version = version::parse_lenient(&current)?;
    version::strip(&mut version, target);
    let formatted = version::format_version(&version);

    manifest.set_version(&formatted);
    manifest.write(dest, &opts.space)?;
    Ok(formatted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn manifest_with(dir: &TempDir, name: &str, version: &str) -> Utf8PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, format!(r#"{{"name":"demo","version":"{version}"}}"#)).unwrap();
        Utf8PathBuf::try_from(path).unwrap()
    }

    fn stored_version(path: &Utf8Path) -> String {
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        value["version"].as_str().unwrap().to_owned()
    }

    fn spec(src: &Utf8Path) -> Vec<FileSpec> {
        vec![FileSpec {
            src: vec![src.to_path_buf()],
            dest: None,
        }]
    }

    fn run_phase(phase: &str, part: Option<&str>, build: Option<&str>, files: &[FileSpec]) -> TaskReport {
        run(phase, part, build, &OptionsConfig::default(), files).unwrap()
    }

    #[test]
    fn unknown_phase_rejected_before_io() {
        let tmp = TempDir::new().unwrap();
        let src = manifest_with(&tmp, "pkg.json", "1.2.3");
        let before = fs::read_to_string(&src).unwrap();

        let err = run("frobnicate", None, None, &OptionsConfig::default(), &spec(&src))
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown phase 'frobnicate'");
        assert_eq!(fs::read_to_string(&src).unwrap(), before);
    }

    #[test]
    fn bump_unknown_part_rejected_before_io() {
        let tmp = TempDir::new().unwrap();
        let src = manifest_with(&tmp, "pkg.json", "1.2.3");
        let before = fs::read_to_string(&src).unwrap();

        let err = run("bump", Some("weekday"), None, &OptionsConfig::default(), &spec(&src))
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown part 'weekday'");
        assert_eq!(fs::read_to_string(&src).unwrap(), before);
    }

    #[test]
    fn bump_missing_part_rejected() {
        let err = run("bump", None, None, &OptionsConfig::default(), &[]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown part ''");
    }

    #[test]
    fn strip_rejects_bump_parts() {
        let err = run("strip", Some("patch"), None, &OptionsConfig::default(), &[]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown part 'patch'");
    }

    #[test]
    fn validate_literal_mode() {
        let report = run_phase("validate", Some("1.2.3"), Some("7"), &[]);
        assert_eq!(report.events.len(), 1);
        let event = &report.events[0];
        assert_eq!(event.event, "semver.validate");
        assert_eq!(event.version, "1.2.3+7");
        assert!(event.src.is_none());
        assert!(event.dest.is_none());
    }

    #[test]
    fn validate_literal_malformed_is_warning() {
        let report = run_phase("validate", Some("not-a-version"), None, &[]);
        assert!(report.events.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].src.is_none());
    }

    #[test]
    fn validate_file_mode_reads_without_writing() {
        let tmp = TempDir::new().unwrap();
        let src = manifest_with(&tmp, "pkg.json", "1.2.3-beta.1+b.5");
        let before = fs::read_to_string(&src).unwrap();

        let report = run_phase("validate", None, None, &spec(&src));
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].version, "1.2.3-beta.1+b.5");
        assert_eq!(report.events[0].src.as_deref(), Some(src.as_path()));
        assert_eq!(fs::read_to_string(&src).unwrap(), before);
    }

    #[test]
    fn set_canonicalizes_and_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let src = manifest_with(&tmp, "pkg.json", "v1.2.3");

        run_phase("set", None, None, &spec(&src));
        assert_eq!(stored_version(&src), "1.2.3");
        let first = fs::read_to_string(&src).unwrap();

        run_phase("set", None, None, &spec(&src));
        assert_eq!(fs::read_to_string(&src).unwrap(), first);
    }

    #[test]
    fn set_explicit_part_with_build() {
        let tmp = TempDir::new().unwrap();
        let src = manifest_with(&tmp, "pkg.json", "0.9.0");

        let report = run_phase("set", Some("2.0.0"), Some("build.7"), &spec(&src));
        assert_eq!(report.events[0].version, "2.0.0+build.7");
        assert_eq!(stored_version(&src), "2.0.0+build.7");
    }

    #[test]
    fn bump_levels() {
        let tmp = TempDir::new().unwrap();
        for (level, expected) in [("patch", "1.2.4"), ("minor", "1.3.0"), ("major", "2.0.0")] {
            let src = manifest_with(&tmp, &format!("{level}.json"), "1.2.3");
            let report = run_phase("bump", Some(level), None, &spec(&src));
            assert_eq!(report.events[0].version, expected);
            assert_eq!(stored_version(&src), expected);
        }
    }

    #[test]
    fn bump_drops_stale_build_unless_given() {
        let tmp = TempDir::new().unwrap();
        let src = manifest_with(&tmp, "pkg.json", "1.2.3+old.1");

        run_phase("bump", Some("patch"), None, &spec(&src));
        assert_eq!(stored_version(&src), "1.2.4");

        let report = run_phase("bump", Some("patch"), Some("new.2"), &spec(&src));
        assert_eq!(report.events[0].version, "1.2.5+new.2");
    }

    #[test]
    fn strip_build_then_prerelease() {
        let tmp = TempDir::new().unwrap();
        let src = manifest_with(&tmp, "pkg.json", "1.2.3-beta.1+build.5");

        run_phase("strip", Some("prerelease"), None, &spec(&src));
        assert_eq!(stored_version(&src), "1.2.3+build.5");

        run_phase("strip", Some("build"), None, &spec(&src));
        assert_eq!(stored_version(&src), "1.2.3");
    }

    #[test]
    fn per_file_isolation() {
        let tmp = TempDir::new().unwrap();
        let good = manifest_with(&tmp, "good.json", "1.2.3");
        let bad = manifest_with(&tmp, "bad.json", "not-semver");
        let also_good = manifest_with(&tmp, "also.json", "0.1.0");
        let bad_before = fs::read_to_string(&bad).unwrap();

        let files = vec![FileSpec {
            src: vec![good.clone(), bad.clone(), also_good.clone()],
            dest: None,
        }];
        let report = run_phase("bump", Some("patch"), None, &files);

        assert_eq!(report.events.len(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].src.as_deref(), Some(bad.as_path()));
        assert_eq!(stored_version(&good), "1.2.4");
        assert_eq!(stored_version(&also_good), "0.1.1");
        assert_eq!(fs::read_to_string(&bad).unwrap(), bad_before);
    }

    #[test]
    fn many_sources_one_dest_last_write_wins() {
        let tmp = TempDir::new().unwrap();
        let first = manifest_with(&tmp, "first.json", "1.0.0");
        let second = manifest_with(&tmp, "second.json", "5.0.0");
        let dest = Utf8PathBuf::try_from(tmp.path().join("out.json")).unwrap();

        let files = vec![FileSpec {
            src: vec![first, second],
            dest: Some(dest.clone()),
        }];
        let report = run_phase("bump", Some("patch"), None, &files);

        assert_eq!(report.events.len(), 2);
        assert_eq!(stored_version(&dest), "5.0.1");
    }

    #[test]
    fn dest_templates_on_phase_and_part() {
        let tmp = TempDir::new().unwrap();
        let src = manifest_with(&tmp, "pkg.json", "1.2.3");
        let dest = Utf8PathBuf::try_from(tmp.path().join("{%phase%}-{%part%}.json")).unwrap();

        let files = vec![FileSpec {
            src: vec![src],
            dest: Some(dest),
        }];
        let report = run_phase("bump", Some("minor"), None, &files);

        let expanded = Utf8PathBuf::try_from(tmp.path().join("bump-minor.json")).unwrap();
        assert_eq!(report.events[0].dest.as_deref(), Some(expanded.as_path()));
        assert_eq!(stored_version(&expanded), "1.3.0");
    }

    #[test]
    fn missing_source_is_warning() {
        let tmp = TempDir::new().unwrap();
        let missing = Utf8PathBuf::try_from(tmp.path().join("nope.json")).unwrap();

        let report = run_phase("set", None, None, &spec(&missing));
        assert!(report.events.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].message.contains("failed to read"));
    }
}
