//! HTTP downloads and zip extraction for themes published as archives

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Metadata returned by a HEAD request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub status: u16,
    pub status_text: String,
    pub content_type: Option<String>,
}

/// Retrieves remote files
pub trait Fetcher {
    /// Issue a metadata-only request for `url`
    fn head(&self, url: &str) -> Result<RemoteFile>;

    /// Save the body of `url` to `dest`
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// [`Fetcher`] backed by a blocking reqwest client
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("ffcss/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn head(&self, url: &str) -> Result<RemoteFile> {
        let response = self
            .client
            .head(url)
            .send()
            .with_context(|| format!("HEAD request to {url} failed"))?;

        let status = response.status();
        Ok(RemoteFile {
            status: status.as_u16(),
            status_text: status.to_string(),
            content_type: response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
        })
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        tracing::debug!("Downloading {} to {}", url, dest.display());
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to download {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("Download failed: HTTP {} for {}", response.status(), url);
        }

        let bytes = response
            .bytes()
            .context("Failed to read download response")?;

        std::fs::write(dest, &bytes)
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        Ok(())
    }
}

/// Media type of a `Content-Type` header value, without parameters
pub fn media_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
}

/// Extract the zip file at `archive` into `dest`, returning the paths of the
/// extracted files
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let file = std::fs::File::open(archive)
        .with_context(|| format!("Failed to open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("{} is not a valid zip file", archive.display()))?;

    let entries: Vec<PathBuf> = (0..zip.len())
        .filter_map(|i| {
            let entry = zip.by_index(i).ok()?;
            if entry.is_dir() {
                return None;
            }
            entry.enclosed_name().map(|name| dest.join(name))
        })
        .collect();

    zip.extract(dest)
        .with_context(|| format!("Failed to extract {}", archive.display()))?;

    Ok(entries)
}
