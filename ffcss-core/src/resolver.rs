//! Classification of the theme identifiers users type

use anyhow::{Context, Result};
use regex::Regex;
use std::fmt;

use crate::error::ThemeError;
use crate::git::Git;

/// How a theme has to be acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A name to look up in the local catalog
    Bare,
    /// A clonable git repository
    Git,
    /// A zip archive served over HTTP
    Website,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Bare => write!(f, "bare"),
            SourceKind::Git => write!(f, "git"),
            SourceKind::Website => write!(f, "website"),
        }
    }
}

/// Whether `candidate` is an absolute URL with a host
pub fn is_valid_url(candidate: &str) -> bool {
    url::Url::parse(candidate).is_ok_and(|url| url.has_host())
}

/// Turn what the user typed into a location and the way to acquire it.
///
/// - `OWNER/REPO` is a GitHub repository, which must be clonable
/// - `DOMAIN.TLD/PATH` gets an `https://` prefix
/// - full URLs are kept as is
/// - anything else is a catalog name
///
/// URLs are git repositories when `git ls-remote` succeeds on them, websites
/// otherwise.
pub fn resolve_source(name: &str, git: &Git) -> Result<(String, SourceKind)> {
    let owner_slash_repo =
        Regex::new(r"^[A-Za-z0-9_-]+/[A-Za-z0-9_-]+$").context("invalid repository pattern")?;
    let protocol_less_url =
        Regex::new(r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+/.*$").context("invalid URL pattern")?;

    if owner_slash_repo.is_match(name) {
        let url = format!("https://github.com/{name}");
        if !git.is_clonable(&url) {
            return Err(ThemeError::NotClonable { url }.into());
        }
        return Ok((url, SourceKind::Git));
    }

    let url = if protocol_less_url.is_match(name) {
        let url = format!("https://{name}");
        if !is_valid_url(&url) {
            return Err(ThemeError::InvalidUrl(url).into());
        }
        url
    } else if is_valid_url(name) {
        name.to_string()
    } else {
        return Ok((name.to_string(), SourceKind::Bare));
    };

    let kind = if git.is_clonable(&url) {
        SourceKind::Git
    } else {
        SourceKind::Website
    };
    tracing::debug!("Resolved {:?} to {} ({})", name, url, kind);
    Ok((url, kind))
}
