//! Observability setup: structured logging.
//!
//! stdout is reserved for task output. Human-readable logging goes to
//! stderr; when a log location is configured (config `log_dir`,
//! `VSTAMP_LOG_DIR`, or `VSTAMP_LOG_PATH`), JSONL additionally goes to a
//! daily-rolling file.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "VSTAMP_LOG_PATH";
const ENV_LOG_DIR: &str = "VSTAMP_LOG_DIR";
const LOG_FILE: &str = "vstamp.jsonl";

/// Guard that must be held for the lifetime of the application so buffered
/// log lines are flushed on exit.
pub struct ObservabilityGuard {
    _log_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialize logging.
///
/// Returns a guard that must be held for the application lifetime.
pub fn init_observability(
    config_log_dir: Option<PathBuf>,
    env_filter: EnvFilter,
) -> Result<ObservabilityGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let (file_layer, log_guard) = match resolve_log_target(config_log_dir.as_deref()) {
        Some(target) => {
            let appender = tracing_appender::rolling::daily(&target.dir, &target.file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    tracing::debug!("observability initialized");

    Ok(ObservabilityGuard {
        _log_guard: log_guard,
    })
}

/// Build an `EnvFilter` based on CLI flags and environment.
///
/// Priority: quiet flag > verbose flag > RUST_LOG env > default_level
pub fn env_filter(quiet: bool, verbose: u8, default_level: &str) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }

    if verbose > 0 {
        let level = match verbose {
            1 => "debug",
            _ => "trace",
        };
        return EnvFilter::new(level);
    }

    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

#[derive(Clone, Debug)]
struct LogTarget {
    dir: PathBuf,
    file_name: String,
}

/// Pick the log file location.
///
/// Priority: `$VSTAMP_LOG_PATH` > `$VSTAMP_LOG_DIR` > config `log_dir` >
/// none (stderr-only logging).
fn resolve_log_target(config_dir: Option<&Path>) -> Option<LogTarget> {
    resolve_log_target_with(
        std::env::var_os(ENV_LOG_PATH).map(PathBuf::from),
        std::env::var_os(ENV_LOG_DIR).map(PathBuf::from),
        config_dir.map(Path::to_path_buf),
    )
}

fn resolve_log_target_with(
    path_override: Option<PathBuf>,
    dir_override: Option<PathBuf>,
    config_dir: Option<PathBuf>,
) -> Option<LogTarget> {
    if let Some(path) = path_override {
        let file_name = path.file_name()?.to_str()?.to_owned();
        let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        return Some(LogTarget { dir, file_name });
    }

    let dir = dir_override.or(config_dir)?;
    Some(LogTarget {
        dir,
        file_name: LOG_FILE.to_owned(),
    })
}
