//! Theme acquisition
//!
//! Themes are downloaded into a uniquely-named staging directory under
//! `<cache>/.download/`, then renamed to `<cache>/<theme>/<variant>` once
//! their name is known. A failed acquisition never leaves anything behind in
//! the cache: the staging directory is removed when its guard drops.

use anyhow::{bail, Context, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::ThemeError;
use crate::git::Git;
use crate::http::{extract_zip, media_type, Fetcher, HttpFetcher};
use crate::manifest::{
    is_single_path_component, Session, Theme, VariantActions, MANIFEST_FILE_NAME,
};
use crate::process::{CommandRunner, SystemRunner};
use crate::resolver::{resolve_source, SourceKind};

/// Media type websites must serve themes with
pub const ZIP_MEDIA_TYPE: &str = "application/zip";

/// Name archives are downloaded to inside the staging directory
const ARCHIVE_FILE_NAME: &str = "theme.zip";

/// Downloads themes into the cache
pub struct Acquirer {
    session: Session,
    runner: Box<dyn CommandRunner>,
    fetcher: Box<dyn Fetcher>,
}

impl Acquirer {
    /// Acquire with `git` and an HTTP client
    pub fn new(session: Session) -> Result<Self> {
        Ok(Self::with_collaborators(
            session,
            Box::new(SystemRunner),
            Box::new(HttpFetcher::new()?),
        ))
    }

    pub fn with_collaborators(
        session: Session,
        runner: Box<dyn CommandRunner>,
        fetcher: Box<dyn Fetcher>,
    ) -> Self {
        Self {
            session,
            runner,
            fetcher,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn git(&self) -> Git<'_> {
        Git::new(self.runner.as_ref())
    }

    /// Classify a theme identifier, see [`resolve_source`]
    pub fn resolve(&self, name: &str) -> Result<(String, SourceKind)> {
        resolve_source(name, &self.git())
    }

    /// Make the theme at `location` available in the cache.
    ///
    /// A supplied `theme` is used instead of the downloaded manifest, and is
    /// returned as is when its cache directory already exists. Without a
    /// supplied theme the manifest has to be downloaded first; when its cache
    /// directory turns out to exist, the download is discarded and the cached
    /// files are kept.
    pub fn acquire(
        &mut self,
        location: &str,
        kind: SourceKind,
        theme: Option<Theme>,
    ) -> Result<Theme> {
        if let Some(theme) = theme.as_ref() {
            if theme.downloaded_to.is_dir() {
                tracing::debug!(
                    "Skipped downloading of {} [{}#{}]: already at {}",
                    location,
                    theme.name(),
                    theme.current_variant(),
                    theme.downloaded_to.display()
                );
                return Ok(theme.clone());
            }
        }

        let (staging, mut theme) = match kind {
            SourceKind::Bare => return self.acquire_from_catalog(location),
            SourceKind::Git => {
                let staging = self.create_staging_dir()?;
                let theme = self
                    .clone_repository(location, staging.path(), theme)
                    .with_context(|| format!("couldn't use the repository {location}"))?;
                (staging, theme)
            }
            SourceKind::Website => {
                let staging = self.create_staging_dir()?;
                let theme = self
                    .download_archive(location, staging.path(), theme)
                    .with_context(|| format!("couldn't use the zip file at {location}"))?;
                (staging, theme)
            }
        };

        if theme.name().is_empty() {
            return Err(ThemeError::UnnamedManifest.into());
        }

        if !is_single_path_component(&theme.name()) {
            return Err(ThemeError::ReservedThemeName(theme.name()).into());
        }

        theme.set_cache_root(self.session.dirs().cache_root());
        theme.refresh_cache_path();
        if theme.downloaded_to.is_dir() {
            tracing::debug!(
                "{} [{}#{}] already cached at {}, discarding the new download",
                location,
                theme.name(),
                theme.current_variant(),
                theme.downloaded_to.display()
            );
            drop(staging);
            return Ok(theme);
        }
        move_into_cache(staging, &theme.downloaded_to)?;

        tracing::info!(
            "Downloaded {} [{}#{}] to {}",
            location,
            theme.name(),
            theme.current_variant(),
            theme.downloaded_to.display()
        );
        Ok(theme)
    }

    /// Download the theme again when applying a variant requires it
    pub fn reacquire_if_needed(&mut self, theme: Theme, actions: VariantActions) -> Result<Theme> {
        if !actions.any() {
            return Ok(theme);
        }

        tracing::debug!("Re-downloading: new location is {}", theme.download_at);
        let download_at = theme.download_at.clone();
        let (location, kind) = self
            .resolve(&download_at)
            .with_context(|| format!("while resolving URL {download_at}"))?;

        self.acquire(&location, kind, Some(theme))
            .with_context(|| format!("couldn't download the variant at {location}"))
    }

    fn create_staging_dir(&self) -> Result<TempDir> {
        let downloads = self.session.dirs().downloads_dir();
        std::fs::create_dir_all(&downloads)
            .with_context(|| format!("couldn't create {}", downloads.display()))?;

        tempfile::Builder::new()
            .tempdir_in(&downloads)
            .with_context(|| {
                format!(
                    "couldn't create a temporary directory at {}",
                    downloads.display()
                )
            })
    }

    fn acquire_from_catalog(&mut self, name: &str) -> Result<Theme> {
        let catalog_dir = self.session.dirs().catalog_dir();
        let catalog = self
            .session
            .load_catalog(&catalog_dir)
            .context("while loading catalog of themes")?;

        let found = catalog.lookup(name)?.clone();
        let location = found.download_at.clone();
        self.acquire(&location, SourceKind::Git, Some(found))
            .context("from catalog")
    }

    fn clone_repository(
        &mut self,
        url: &str,
        staging: &Path,
        supplied: Option<Theme>,
    ) -> Result<Theme> {
        let git = Git::new(self.runner.as_ref());

        let branch = supplied
            .as_ref()
            .map(|theme| theme.branch.as_str())
            .filter(|branch| !branch.is_empty());
        tracing::debug!("Cloning {} into {}", url, staging.display());
        git.clone_repository(url, staging, branch)?;

        let theme = match supplied {
            Some(theme) => theme,
            None => {
                let manifest = staging.join(MANIFEST_FILE_NAME);
                if !manifest.is_file() {
                    return Err(ThemeError::ManifestNotFound(manifest).into());
                }
                let theme = self
                    .session
                    .load_manifest(&manifest)
                    .context("could not load manifest")?;

                if !theme.branch.is_empty() {
                    tracing::debug!("Switching to branch {:?}", theme.branch);
                    git.switch_branch(staging, &theme.branch)
                        .with_context(|| format!("while switching to branch {:?}", theme.branch))?;
                }
                theme
            }
        };

        if !theme.commit.is_empty() {
            tracing::debug!("Switching to commit {:?}", theme.commit);
            git.checkout_commit(staging, &theme.commit)
                .with_context(|| format!("while checking out commit {:?}", theme.commit))?;
        }
        if !theme.tag.is_empty() {
            tracing::debug!("Switching to tag {:?}", theme.tag);
            git.checkout_tag(staging, &theme.tag)
                .with_context(|| format!("while checking out tag {:?}", theme.tag))?;
        }

        Ok(theme)
    }

    fn download_archive(
        &mut self,
        url: &str,
        staging: &Path,
        supplied: Option<Theme>,
    ) -> Result<Theme> {
        let remote = self
            .fetcher
            .head(url)
            .context("couldn't check remote file")?;
        if remote.status >= 400 {
            bail!(
                "couldn't check remote file: server returned {}",
                remote.status_text
            );
        }
        let content_type = remote.content_type.as_deref().unwrap_or_default();
        if media_type(content_type) != ZIP_MEDIA_TYPE {
            bail!("expected a zip file ({ZIP_MEDIA_TYPE}), got {content_type:?}");
        }

        let archive = staging.join(ARCHIVE_FILE_NAME);
        self.fetcher
            .download(url, &archive)
            .context("couldn't download zip file")?;

        tracing::debug!("Unzipping {} to {}", archive.display(), staging.display());
        let extracted = extract_zip(&archive, staging)
            .with_context(|| format!("while unzipping {}", archive.display()))?;
        std::fs::remove_file(&archive)
            .with_context(|| format!("couldn't remove {}", archive.display()))?;
        tracing::debug!("Extracted {} files", extracted.len());

        match supplied {
            Some(theme) => Ok(theme),
            None => {
                let manifest = find_manifest(staging).ok_or(ThemeError::ArchiveWithoutManifest)?;
                self.session
                    .load_manifest(&manifest)
                    .context("couldn't load the manifest file")
            }
        }
    }
}

/// The manifest closest to `root`, if any
fn find_manifest(root: &Path) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file() && entry.file_name() == OsStr::new(MANIFEST_FILE_NAME)
        })
        .min_by_key(|entry| entry.depth())
        .map(|entry| entry.into_path())
}

/// Rename the staging directory to `target`. On failure the staging
/// directory is removed along with its guard.
fn move_into_cache(staging: TempDir, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).context("while creating final cache location")?;
    }

    std::fs::rename(staging.path(), target).with_context(|| {
        format!(
            "while moving from temporary downloads {} to final cache location {}",
            staging.path().display(),
            target.display()
        )
    })?;
    // Nothing left at the staging path, the guard's cleanup is a no-op
    drop(staging);
    Ok(())
}
