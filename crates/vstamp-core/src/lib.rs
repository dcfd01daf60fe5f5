//! Core library for vstamp.
//!
//! This crate provides the foundational types and functionality used by the
//! `vstamp` CLI and any downstream consumers.
//!
//! # Modules
//!
//! - [`config`] - Configuration loading and management
//! - [`error`] - Error types and result aliases
//! - [`manifest`] - JSON manifest access (the `"version"` field)
//! - [`options`] - Effective option resolution and template expansion
//! - [`task`] - Phase dispatch and per-file processing
//! - [`version`] - Version formatting, cleaning, bumping, stripping
//!
//! # Quick Start
//!
//! ```no_run
//! use vstamp_core::task::{self, FileSpec};
//! use vstamp_core::options::OptionsConfig;
//!
//! let files = vec![FileSpec {
//!     src: vec!["package.json".into()],
//!     dest: None,
//! }];
//! let report = task::run("bump", Some("patch"), None, &OptionsConfig::default(), &files)
//!     .expect("bump failed");
//!
//! for event in &report.events {
//!     println!("{}: {}", event.event, event.version);
//! }
//! ```
#![deny(unsafe_code)]

pub mod config;

pub mod error;

pub mod manifest;

pub mod options;

pub mod task;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

pub use task::{FileSpec, Phase, TaskError, TaskEvent, TaskReport, TaskWarning};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
