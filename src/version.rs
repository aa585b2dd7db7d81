//! Schema versioning and change severity

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Severity of a schema change, most severe first.
///
/// The derived ordering follows declaration order, so `Major` sorts before
/// `Patch` and folding a set of levels with `min` yields the most severe one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeLevel {
    /// Breaking change; existing consumers or producers may be affected
    Major,
    /// Additive, non-breaking change
    Minor,
    /// Non-structural change (titles, descriptions, formatting)
    Patch,
    /// The schemas are structurally and textually identical
    NoChanges,
}

impl ChangeLevel {
    /// The more severe of two levels
    pub fn most_severe(self, other: ChangeLevel) -> ChangeLevel {
        self.min(other)
    }
}

impl fmt::Display for ChangeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeLevel::Major => "major",
            ChangeLevel::Minor => "minor",
            ChangeLevel::Patch => "patch",
            ChangeLevel::NoChanges => "no_changes",
        };
        write!(f, "{}", label)
    }
}

/// Semantic version of an event type schema
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaVersion(Version);

impl SchemaVersion {
    /// The version assigned to a newly registered schema
    pub fn initial() -> Self {
        Self(Version::new(1, 0, 0))
    }

    /// Parse from a version string
    pub fn parse(version_str: &str) -> Result<Self> {
        // Strip leading 'v' if present
        let version_str = version_str.strip_prefix('v').unwrap_or(version_str);
        let version = Version::parse(version_str)?;
        Ok(Self(version))
    }

    /// Bump the component matching the change level and reset the lower ones.
    ///
    /// `NoChanges` leaves the version untouched.
    pub fn bump(&self, level: ChangeLevel) -> Self {
        match level {
            ChangeLevel::Major => Self(Version::new(self.0.major + 1, 0, 0)),
            ChangeLevel::Minor => Self(Version::new(self.0.major, self.0.minor + 1, 0)),
            ChangeLevel::Patch => Self(Version::new(self.0.major, self.0.minor, self.0.patch + 1)),
            ChangeLevel::NoChanges => self.clone(),
        }
    }

    /// The underlying semantic version
    pub fn as_semver(&self) -> &Version {
        &self.0
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
