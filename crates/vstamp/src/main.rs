//! vstamp CLI
#![deny(unsafe_code)]

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Parser;
use tracing::debug;
use vstamp::{Cli, output, unescape_space};
use vstamp_core::config::ConfigLoader;
use vstamp_core::task::{self, FileSpec};

mod observability;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.color.apply();

    if let Some(ref dir) = cli.chdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| {
        anyhow::anyhow!(
            "current directory is not valid UTF-8: {}",
            e.into_path_buf().display()
        )
    })?;
    let mut loader = ConfigLoader::new().with_project_search(&cwd);
    if let Some(ref config_path) = cli.config {
        loader = loader.with_file(utf8_path(config_path, "config")?);
    }
    let config = loader.load().context("failed to load configuration")?;

    let env_filter = observability::env_filter(cli.quiet, cli.verbose, config.log_level.as_str());
    let _guard = observability::init_observability(
        config
            .log_dir
            .as_ref()
            .map(|dir| dir.as_std_path().to_path_buf()),
        env_filter,
    )
    .context("failed to initialize logging")?;

    debug!(
        phase = %cli.phase,
        part = ?cli.part,
        build = ?cli.build,
        json = cli.json,
        chdir = ?cli.chdir,
        "CLI initialized"
    );

    // Command-line files override the configured list.
    let files: Vec<FileSpec> = if cli.files.is_empty() {
        config.files.clone()
    } else {
        let src = cli
            .files
            .iter()
            .map(|path| utf8_path(path, "file"))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let dest = cli
            .dest
            .as_ref()
            .map(|path| utf8_path(path, "dest"))
            .transpose()?;
        vec![FileSpec { src, dest }]
    };

    // --space overrides the configured indentation.
    let mut options = config.options.clone();
    if let Some(ref space) = cli.space {
        options.space = Some(unescape_space(space));
    }

    let result = task::run(
        &cli.phase,
        cli.part.as_deref(),
        cli.build.as_deref(),
        &options,
        &files,
    );
    match result {
        Ok(report) => output::render(&report, cli.json, cli.quiet),
        Err(err) => {
            tracing::error!(error = %err, "fatal error");
            Err(err.into())
        }
    }
}

fn utf8_path(path: &std::path::Path, what: &str) -> anyhow::Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|p| anyhow::anyhow!("{what} path is not valid UTF-8: {}", p.display()))
}
