//! JSON manifest access.
//!
//! A manifest is a JSON object carrying a string `"version"` field. Only that
//! field is ever read or mutated; every other field round-trips untouched and
//! in the order it was read (serde_json's `preserve_order` feature).

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};
use thiserror::Error;

/// The one manifest field this tool cares about.
const VERSION_FIELD: &str = "version";

/// Errors from manifest I/O and structure.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Failed to read the source file.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file that could not be read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write the destination file.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The file that could not be written.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid JSON.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        /// The offending file.
        path: Utf8PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The top-level JSON value is not an object.
    #[error("{path} is not a JSON object")]
    NotAnObject {
        /// The offending file.
        path: Utf8PathBuf,
    },

    /// The object has no `"version"` field.
    #[error("no \"version\" field in {path}")]
    MissingVersion {
        /// The offending file.
        path: Utf8PathBuf,
    },

    /// The `"version"` field is not a string.
    #[error("\"version\" in {path} is not a string")]
    VersionNotString {
        /// The offending file.
        path: Utf8PathBuf,
    },
}

/// Result alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// A JSON manifest loaded into memory.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: Utf8PathBuf,
    fields: Map<String, Value>,
}

impl Manifest {
    /// Read and parse the manifest at `path`.
    pub fn read(path: &Utf8Path) -> ManifestResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_owned(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|source| ManifestError::Json {
            path: path.to_owned(),
            source,
        })?;
        match value {
            Value::Object(fields) => Ok(Self {
                path: path.to_owned(),
                fields,
            }),
            _ => Err(ManifestError::NotAnObject {
                path: path.to_owned(),
            }),
        }
    }

    /// The path this manifest was read from.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The stored version string.
    pub fn version(&self) -> ManifestResult<&str> {
        match self.fields.get(VERSION_FIELD) {
            Some(Value::String(version)) => Ok(version),
            Some(_) => Err(ManifestError::VersionNotString {
                path: self.path.clone(),
            }),
            None => Err(ManifestError::MissingVersion {
                path: self.path.clone(),
            }),
        }
    }

    /// Replace the stored version string. The field keeps its position.
    pub fn set_version(&mut self, version: &str) {
        self.fields
            .insert(VERSION_FIELD.to_owned(), Value::String(version.to_owned()));
    }

    /// Serialize with `space` as the indentation unit and write to `dest`.
    ///
    /// The write happens in one shot after serialization succeeds, so a
    /// failed transform never leaves a half-written file behind.
    pub fn write(&self, dest: &Utf8Path, space: &str) -> ManifestResult<()> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(space.as_bytes());
        let mut ser = Serializer::with_formatter(&mut buf, formatter);
        self.fields
            .serialize(&mut ser)
            .map_err(|source| ManifestError::Json {
                path: dest.to_owned(),
                source,
            })?;
        buf.push(b'\n');
        fs::write(dest, buf).map_err(|source| ManifestError::Write {
            path: dest.to_owned(),
            source,
        })
    }
}
