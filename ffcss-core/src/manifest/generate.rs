//! Writing manifests back out, for `ffcss init`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{Theme, MANIFEST_FILE_NAME};

/// Comment written at the top of generated manifest files
pub const MANIFEST_HEADER: &str = concat!(
    "# This is a manifest for a FirefoxCSS theme.\n",
    "# See https://github.com/ewen-lbh/ffcss for more information.\n",
);

/// Top-level keys preceded by a blank line in generated manifests
const KEY_GROUP_STARTS: &[&str] = &[
    "name", "variants", "os", "download", "config", "run", "message",
];

impl Theme {
    /// A blank theme for the repository checked out at `working_dir`.
    ///
    /// `origin` is the URL of the repository's `origin` remote, if it has
    /// one. Themes not hosted on GitHub are named after `working_dir`.
    pub fn initialize(working_dir: &Path, origin: Option<&str>) -> Theme {
        let mut theme = Theme::new();
        theme.ffcss_version = crate::version_major();
        theme.download_at = origin
            .map(|url| url.trim().trim_end_matches(".git").to_string())
            .unwrap_or_default();

        if !theme.download_at.starts_with(super::GITHUB_PREFIX) {
            theme.explicit_name = working_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        theme
    }

    /// YAML source of the theme's manifest.
    ///
    /// Themes read from a file give back their source text untouched.
    /// Others are serialized, with the name spelled out and a config holding
    /// nothing but the defaults left out.
    pub fn generate_manifest(&self) -> Result<String> {
        if !self.raw.is_empty() {
            return Ok(self.raw.clone());
        }

        let mut theme = self.clone();
        theme.explicit_name = self.name();
        if theme.config == Theme::new().config {
            theme.config.clear();
        }

        let content =
            serde_yaml_ng::to_string(&theme).context("while marshaling manifest into YAML")?;
        Ok(space_key_groups(&content))
    }

    /// Write the manifest to `ffcss.yaml` inside `directory`, returning the
    /// path written to
    pub fn write_manifest(&self, directory: &Path) -> Result<PathBuf> {
        let content = self
            .generate_manifest()
            .with_context(|| format!("while generating manifest contents for {}", self.name()))?;

        let path = directory.join(MANIFEST_FILE_NAME);
        std::fs::write(&path, format!("{MANIFEST_HEADER}{content}"))
            .with_context(|| format!("while writing the manifest {}", path.display()))?;
        Ok(path)
    }
}

/// Put a blank line before each top-level key starting a group
fn space_key_groups(content: &str) -> String {
    let mut spaced = String::with_capacity(content.len() + KEY_GROUP_STARTS.len());
    for (index, line) in content.lines().enumerate() {
        let starts_group = KEY_GROUP_STARTS
            .iter()
            .any(|key| line.strip_prefix(key).is_some_and(|rest| rest.starts_with(':')));
        if index > 0 && starts_group {
            spaced.push('\n');
        }
        spaced.push_str(line);
        spaced.push('\n');
    }
    spaced
}
