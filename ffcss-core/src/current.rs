//! Current theme registry (`<config>/currently.yaml`)
//!
//! Remembers which theme is applied to each Firefox profile, keyed by the
//! profile's full name.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Theme name applied to each profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrentThemes {
    by_profile: BTreeMap<String, String>,
}

impl CurrentThemes {
    /// Load the registry, creating an empty file when there is none yet
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, "").with_context(|| {
                format!("while creating current themes list file {}", path.display())
            })?;
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("while reading current themes list")?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml_ng::from_str(&content).context("while parsing current themes list")
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml_ng::to_string(self).context("while marshaling into YAML")?;
        std::fs::write(path, content).context("while writing new contents")?;

        Ok(())
    }

    /// Record `theme_name` as applied to `profile`, replacing any previous
    /// theme
    pub fn register(&mut self, profile: &str, theme_name: &str) {
        self.by_profile
            .insert(profile.to_string(), theme_name.to_string());
    }

    /// Register and persist in one go
    pub fn register_at(path: &Path, profile: &str, theme_name: &str) -> Result<()> {
        let mut current = Self::load_from_path(path)?;
        current.register(profile, theme_name);
        current.save_to_path(path)
    }

    pub fn get(&self, profile: &str) -> Option<&str> {
        self.by_profile.get(profile).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_profile
            .iter()
            .map(|(profile, theme)| (profile.as_str(), theme.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.by_profile.is_empty()
    }
}
