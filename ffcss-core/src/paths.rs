//! Cache and configuration directories
//!
//! ```text
//! ~/.cache/ffcss/
//!     ├── .download/          ← staging area for in-progress downloads
//!     └── <theme>/<variant>/  ← one directory per downloaded variant ("_" for none)
//! ~/.config/ffcss/
//!     ├── themes/*.yaml       ← catalog manifests
//!     └── currently.yaml      ← theme applied to each profile
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Name of the staging directory inside the cache root. No theme may use it.
pub const TEMP_DOWNLOADS_DIR_NAME: &str = ".download";

/// Variant name used when no variant is applied
pub const ROOT_VARIANT_NAME: &str = "_";

/// Name of the catalog directory inside the configuration root
pub const CATALOG_DIR_NAME: &str = "themes";

/// Name of the per-profile current theme document
pub const CURRENT_THEMES_FILE_NAME: &str = "currently.yaml";

/// Roots of the on-disk state of ffcss
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDirs {
    cache: PathBuf,
    config: PathBuf,
}

impl DataDirs {
    /// Use explicit roots
    pub fn new(cache: impl Into<PathBuf>, config: impl Into<PathBuf>) -> Self {
        Self {
            cache: cache.into(),
            config: config.into(),
        }
    }

    /// Default roots under the user's home directory
    pub fn discover() -> Result<Self> {
        let home = dirs::home_dir().context("couldn't get your home directory")?;
        Ok(Self::new(
            home.join(".cache").join("ffcss"),
            home.join(".config").join("ffcss"),
        ))
    }

    /// Default roots, with any given override taking precedence
    pub fn discover_with_overrides(
        cache: Option<PathBuf>,
        config: Option<PathBuf>,
    ) -> Result<Self> {
        if let (Some(cache), Some(config)) = (&cache, &config) {
            return Ok(Self::new(cache.clone(), config.clone()));
        }
        let defaults = Self::discover()?;
        Ok(Self {
            cache: cache.unwrap_or(defaults.cache),
            config: config.unwrap_or(defaults.config),
        })
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache
    }

    pub fn config_root(&self) -> &Path {
        &self.config
    }

    /// Directory a theme variant is cached to
    pub fn theme_cache(&self, theme_name: &str, variant_name: &str) -> PathBuf {
        self.cache.join(theme_name).join(variant_name)
    }

    /// Staging area for downloads whose theme name is not known yet
    pub fn downloads_dir(&self) -> PathBuf {
        self.cache.join(TEMP_DOWNLOADS_DIR_NAME)
    }

    /// Directory of catalog manifests
    pub fn catalog_dir(&self) -> PathBuf {
        self.config.join(CATALOG_DIR_NAME)
    }

    /// Path of the per-profile current theme document
    pub fn current_themes_file(&self) -> PathBuf {
        self.config.join(CURRENT_THEMES_FILE_NAME)
    }

    /// Create the directories ffcss needs to function
    pub fn create_all(&self) -> Result<()> {
        for dir in [self.cache.clone(), self.catalog_dir()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("couldn't create data directory {}", dir.display()))?;
        }
        Ok(())
    }

    /// Remove the staging area and anything left in it by interrupted runs
    pub fn clean_download_area(&self) -> Result<()> {
        remove_dir_if_exists(&self.downloads_dir())
    }

    /// Remove every cached theme
    pub fn clear_whole_cache(&self) -> Result<()> {
        remove_dir_if_exists(&self.cache)
    }
}

fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    std::fs::remove_dir_all(dir).with_context(|| format!("couldn't remove {}", dir.display()))?;
    tracing::debug!("Removed {}", dir.display());
    Ok(())
}
