//! Firefox profile discovery
//!
//! Profiles live in directories named `<8 character id>.<name>` inside an
//! OS-dependent profiles folder.

use anyhow::{bail, Context, Result};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::manifest::Theme;
use crate::version::{profile_firefox_version, FirefoxVersion};

/// A Firefox profile directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirefoxProfile {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
}

impl FirefoxProfile {
    /// Split the directory name of `path` into the profile's id and name
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let base = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (id, name) = base.split_once('.').unwrap_or((base.as_str(), ""));

        Self {
            id: id.to_string(),
            name: name.to_string(),
            path,
        }
    }

    /// Directory name of the profile, the key used in `currently.yaml`
    pub fn full_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn firefox_version(&self) -> Result<FirefoxVersion> {
        profile_firefox_version(&self.path)
    }
}

impl fmt::Display for FirefoxProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Where Firefox keeps the profiles of `operating_system`, relative to
/// `home`
pub fn default_profiles_dir_in(home: &Path, operating_system: &str) -> Result<PathBuf> {
    let dir = match operating_system {
        "linux" => home.join(".mozilla").join("firefox"),
        "macos" => home
            .join("Library")
            .join("Application Support")
            .join("Firefox")
            .join("Profiles"),
        "windows" => home
            .join("AppData")
            .join("Roaming")
            .join("Mozilla")
            .join("Firefox")
            .join("Profiles"),
        other => bail!("unknown operating system {other}"),
    };
    Ok(dir)
}

/// Where Firefox keeps the profiles of `operating_system` for the current
/// user
pub fn default_profiles_dir(operating_system: &str) -> Result<PathBuf> {
    let home = dirs::home_dir().context("couldn't get your home directory")?;
    default_profiles_dir_in(&home, operating_system)
}

/// Profile directories inside `profiles_dir`, sorted by path
pub fn profile_paths(profiles_dir: &Path) -> Result<Vec<PathBuf>> {
    let release_id = Regex::new(r"^[a-z0-9]{8}\.\w+").context("invalid profile pattern")?;

    let entries = std::fs::read_dir(profiles_dir)
        .with_context(|| format!("couldn't read {}", profiles_dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("couldn't read {}", profiles_dir.display()))?;
        if !release_id.is_match(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Profiles inside `profiles_dir`, or inside the default profiles folder of
/// the running OS
pub fn profiles(profiles_dir: Option<&Path>) -> Result<Vec<FirefoxProfile>> {
    let profiles_dir = match profiles_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_profiles_dir(crate::manifest::current_os())
            .context("couldn't get the profiles folder. Try to use --profiles-dir")?,
    };

    let paths = profile_paths(&profiles_dir).context("while getting profile paths")?;
    Ok(paths.into_iter().map(FirefoxProfile::from_path).collect())
}

/// A profile running a Firefox version a theme does not support
#[derive(Debug, Clone, PartialEq)]
pub struct IncompatibleProfile {
    pub profile: FirefoxProfile,
    pub version: FirefoxVersion,
}

impl Theme {
    /// Profiles among `profiles` whose Firefox version falls outside the
    /// theme's constraint. Profiles whose version can't be read are skipped
    /// with a warning.
    pub fn incompatible_profiles(&self, profiles: &[FirefoxProfile]) -> Vec<IncompatibleProfile> {
        let Some(constraint) = self.firefox_constraint() else {
            return Vec::new();
        };

        let mut incompatible = Vec::new();
        for profile in profiles {
            let version = match profile.firefox_version() {
                Ok(version) => version,
                Err(e) => {
                    tracing::warn!(
                        "Couldn't get the Firefox version of profile {}: {:#}",
                        profile,
                        e
                    );
                    continue;
                }
            };
            if !constraint.fulfilled_by(&version) {
                incompatible.push(IncompatibleProfile {
                    profile: profile.clone(),
                    version,
                });
            }
        }
        incompatible
    }
}
