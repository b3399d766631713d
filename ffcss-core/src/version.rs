//! Firefox version parsing and version-range constraints
//!
//! Manifests declare which Firefox versions a theme supports through the
//! `firefox` entry. Four forms are accepted, where X and Z are integers and
//! Y and W are integers or the wildcard `x`:
//!
//! ```text
//! Format     Meaning                          Interval
//! X.Y+       X.Y or higher                    [X.Y, +inf]
//! X.Y-Z.W    between X.Y and Z.W (inclusive)  [X.Y, Z.W]
//! up to X.Y  X.Y but not higher               [0.0, X.Y]
//! X.Y        exactly X.Y                      [X.Y, X.Y]
//! ```
//!
//! Leaving out the minor part (`90` instead of `90.1`) means "any minor
//! version", so `90` matches 90.0, 90.1 and so on.

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::prefs;

/// Token used in place of a minor version number to mean "any"
pub const WILDCARD: &str = "x";

/// Preference holding the Firefox version a profile was last opened with
pub const MILESTONE_PREF: &str = "browser.startup.homepage_override.mstone";

/// Leaf errors of version parsing
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VersionError {
    #[error("version number cannot be negative")]
    Negative,

    #[error("lower bound ({min}) is higher than upper bound ({max})")]
    InvertedRange {
        min: FirefoxVersion,
        max: FirefoxVersion,
    },
}

/// A Firefox version of the form `major.minor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FirefoxVersion {
    pub major: u32,
    /// `None` stands for the wildcard (`90.x`)
    pub minor: Option<u32>,
}

impl FirefoxVersion {
    /// Upper end of open-ended constraints
    pub const INFINITY: FirefoxVersion = FirefoxVersion {
        major: u32::MAX,
        minor: Some(u32::MAX),
    };

    /// Lower end of `up to` constraints
    pub const ZERO: FirefoxVersion = FirefoxVersion {
        major: 0,
        minor: Some(0),
    };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor: Some(minor),
        }
    }

    pub const fn any_minor(major: u32) -> Self {
        Self { major, minor: None }
    }

    /// Parse a version string, substituting `default_minor` when the string
    /// has no minor part. `default_minor` is itself either an integer or the
    /// wildcard.
    pub fn parse_with_default_minor(text: &str, default_minor: &str) -> Result<Self> {
        let mut fragments = text.split('.');
        let major_text = fragments.next().unwrap_or_default();
        let minor_text = fragments.next().unwrap_or(default_minor);

        let major = parse_segment(major_text).context("while converting major segment")?;
        let minor = if minor_text == WILDCARD {
            None
        } else {
            Some(parse_segment(minor_text).context("while converting minor segment")?)
        };

        Ok(Self { major, minor })
    }

    /// `self >= other`, comparing majors only when either minor is a wildcard
    pub fn at_least(&self, other: &FirefoxVersion) -> bool {
        match (self.minor, other.minor) {
            (Some(minor), Some(other_minor)) => (self.major, minor) >= (other.major, other_minor),
            _ => self.major >= other.major,
        }
    }

    /// `self <= other`, comparing majors only when either minor is a wildcard
    pub fn at_most(&self, other: &FirefoxVersion) -> bool {
        match (self.minor, other.minor) {
            (Some(minor), Some(other_minor)) => (self.major, minor) <= (other.major, other_minor),
            _ => self.major <= other.major,
        }
    }
}

fn parse_segment(segment: &str) -> Result<u32> {
    let value: i64 = segment
        .trim()
        .parse()
        .with_context(|| format!("invalid number {segment:?}"))?;
    if value < 0 {
        return Err(VersionError::Negative.into());
    }
    u32::try_from(value).with_context(|| format!("{value} is too large"))
}

impl FromStr for FirefoxVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_with_default_minor(s, WILDCARD)
    }
}

impl fmt::Display for FirefoxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.minor {
            Some(minor) => write!(f, "{}.{}", self.major, minor),
            None => write!(f, "{}.{}", self.major, WILDCARD),
        }
    }
}

/// A closed interval of Firefox versions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirefoxVersionConstraint {
    pub min: FirefoxVersion,
    pub max: FirefoxVersion,
    /// Completes "this theme ensures compatibility with firefox ..."
    pub sentence: String,
}

impl FirefoxVersionConstraint {
    /// Whether `version` lies within `[min, max]`
    pub fn fulfilled_by(&self, version: &FirefoxVersion) -> bool {
        tracing::trace!("checking if {} is in [{}, {}]", version, self.min, self.max);
        version.at_least(&self.min) && version.at_most(&self.max)
    }
}

impl FromStr for FirefoxVersionConstraint {
    type Err = anyhow::Error;

    fn from_str(constraint: &str) -> Result<Self> {
        if let Some(minimum) = constraint.strip_suffix('+') {
            let min: FirefoxVersion = minimum
                .parse()
                .with_context(|| format!("while parsing minimum constraint {constraint:?}"))?;
            return Ok(Self {
                min,
                max: FirefoxVersion::INFINITY,
                sentence: format!("version {min} or higher"),
            });
        }

        if constraint.matches('-').count() == 1 {
            let (lower, upper) = constraint.split_once('-').unwrap_or_default();
            let min: FirefoxVersion = lower.parse().with_context(|| {
                format!("while parsing lower bound of range constraint {constraint:?}")
            })?;
            let max: FirefoxVersion = upper.parse().with_context(|| {
                format!("while parsing upper bound of range constraint {constraint:?}")
            })?;
            if !min.at_most(&max) {
                return Err(VersionError::InvertedRange { min, max }.into());
            }
            return Ok(Self {
                min,
                max,
                sentence: format!("{min}–{max}"),
            });
        }

        if let Some(maximum) = constraint.strip_prefix("up to ") {
            let max: FirefoxVersion = maximum
                .parse()
                .with_context(|| format!("while parsing maximum constraint {constraint:?}"))?;
            return Ok(Self {
                min: FirefoxVersion::ZERO,
                max,
                sentence: format!("version {max} or lower"),
            });
        }

        let exact: FirefoxVersion = constraint
            .parse()
            .with_context(|| format!("while parsing exact match constraint {constraint:?}"))?;
        Ok(Self {
            min: exact,
            max: exact,
            sentence: format!("{exact} only"),
        })
    }
}

/// Firefox version of a profile, read from its `prefs.js`.
///
/// Profiles that were never opened have no such entry and yield an error.
pub fn profile_firefox_version(profile_dir: &Path) -> Result<FirefoxVersion> {
    let prefs_path = profile_dir.join("prefs.js");
    let content = std::fs::read_to_string(&prefs_path)
        .with_context(|| format!("while reading {}", prefs_path.display()))?;

    let version_string = prefs::value_of_user_pref(&content, MILESTONE_PREF)
        .context("while getting value in prefs.js")?;

    version_string
        .parse()
        .with_context(|| format!("while parsing version string {version_string:?}"))
}
