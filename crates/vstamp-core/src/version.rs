//! Version formatting, cleaning, bumping, and stripping.
//!
//! The `semver` crate supplies the grammar (parsing and the component types);
//! this module supplies the operations the task layer needs on top of it:
//! lenient parsing, normalization without build metadata, part increments,
//! and part stripping.

use std::fmt::Write as _;

use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// Failed to parse a semver string.
    #[error("invalid semver: {0}")]
    InvalidSemver(#[from] semver::Error),

    /// A numeric prerelease identifier could not be incremented.
    #[error("invalid prerelease identifier '{0}'")]
    InvalidPrerelease(String),
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Version part a bump can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    /// Major release (X.0.0).
    Major,
    /// Minor release (x.Y.0).
    Minor,
    /// Patch release (x.y.Z).
    Patch,
    /// Prerelease step (x.y.z-N).
    Prerelease,
}

impl BumpLevel {
    /// Parse a part name. Returns `None` for anything that is not a valid
    /// bump target; callers decide how to surface that.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "major" => Some(Self::Major),
            "minor" => Some(Self::Minor),
            "patch" => Some(Self::Patch),
            "prerelease" => Some(Self::Prerelease),
            _ => None,
        }
    }
}

impl std::fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
            Self::Prerelease => write!(f, "prerelease"),
        }
    }
}

/// Identifier sequence a strip can clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripPart {
    /// The prerelease identifiers (`-beta.1`).
    Prerelease,
    /// The build metadata identifiers (`+build.5`).
    Build,
}

impl StripPart {
    /// Parse a part name. Returns `None` for anything that is not strippable.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "prerelease" => Some(Self::Prerelease),
            "build" => Some(Self::Build),
            _ => None,
        }
    }
}

impl std::fmt::Display for StripPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prerelease => write!(f, "prerelease"),
            Self::Build => write!(f, "build"),
        }
    }
}

/// Parse a version string, tolerating surrounding whitespace and a leading
/// `=` or `v`/`V` prefix.
pub fn parse_lenient(text: &str) -> VersionResult<Version> {
    let text = text.trim();
    let text = text.strip_prefix('=').unwrap_or(text);
    let text = text
        .strip_prefix('v')
        .or_else(|| text.strip_prefix('V'))
        .unwrap_or(text);
    Ok(Version::parse(text.trim())?)
}

/// Render a version as `major.minor.patch[-pre][+build]`.
///
/// Build metadata is appended here rather than left to the semver `Display`
/// impl, so the output is identical whether the identifiers came from the
/// parsed text or were spliced in from an explicit `build` argument.
pub fn format_version(version: &Version) -> String {
    let mut out = format!("{}.{}.{}", version.major, version.minor, version.patch);
    if !version.pre.is_empty() {
        let _ = write!(out, "-{}", version.pre);
    }
    if !version.build.is_empty() {
        let _ = write!(out, "+{}", version.build);
    }
    out
}

/// Normalize a version string: trim, drop a leading `=`/`v`, and drop build
/// metadata.
///
/// This is what lets an explicit `build` argument *replace* stored build
/// identifiers instead of concatenating with them.
pub fn clean(text: &str) -> VersionResult<String> {
    let version = parse_lenient(text)?;
    let mut out = format!("{}.{}.{}", version.major, version.minor, version.patch);
    if !version.pre.is_empty() {
        let _ = write!(out, "-{}", version.pre);
    }
    Ok(out)
}

/// Apply a bump level, resetting lower-order parts.
///
/// Build metadata carries through untouched at this layer; callers that want
/// it dropped run the input through [`clean`] first.
pub fn bump(version: &Version, level: BumpLevel) -> VersionResult<Version> {
    let next = match level {
        BumpLevel::Major => Version {
            major: version.major + 1,
            minor: 0,
            patch: 0,
            pre: Prerelease::EMPTY,
            build: version.build.clone(),
        },
        BumpLevel::Minor => Version {
            major: version.major,
            minor: version.minor + 1,
            patch: 0,
            pre: Prerelease::EMPTY,
            build: version.build.clone(),
        },
        BumpLevel::Patch => Version {
            major: version.major,
            minor: version.minor,
            patch: version.patch + 1,
            pre: Prerelease::EMPTY,
            build: version.build.clone(),
        },
        BumpLevel::Prerelease => bump_prerelease(version)?,
    };
    Ok(next)
}

/// Prerelease increment rules:
/// - no prerelease yet: bump patch and start the sequence at `0`
/// - last numeric identifier: increment it
/// - no numeric identifier: append `0`
fn bump_prerelease(version: &Version) -> VersionResult<Version> {
    if version.pre.is_empty() {
        return Ok(Version {
            major: version.major,
            minor: version.minor,
            patch: version.patch + 1,
            pre: Prerelease::new("0")?,
            build: version.build.clone(),
        });
    }

    let mut ids: Vec<String> = version.pre.as_str().split('.').map(str::to_owned).collect();
    match ids
        .iter()
        .rposition(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
    {
        Some(idx) => {
            let n: u64 = ids[idx]
                .parse()
                .map_err(|_| VersionError::InvalidPrerelease(ids[idx].clone()))?;
            ids[idx] = (n + 1).to_string();
        }
        None => ids.push("0".to_owned()),
    }

    Ok(Version {
        major: version.major,
        minor: version.minor,
        patch: version.patch,
        pre: Prerelease::new(&ids.join("."))?,
        build: version.build.clone(),
    })
}

/// Clear the named identifier sequence.
pub fn strip(version: &mut Version, part: StripPart) {
    match part {
        StripPart::Prerelease => version.pre = Prerelease::EMPTY,
        StripPart::Build => version.build = BuildMetadata::EMPTY,
    }
}
