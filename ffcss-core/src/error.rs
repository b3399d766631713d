//! Domain errors for theme resolution, loading and lookup

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while classifying, loading or acquiring a theme
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ThemeError {
    /// A GitHub `owner/repo` shorthand does not point to a clonable repository
    #[error("{url} is not clonable. Make sure it exists")]
    NotClonable { url: String },

    /// A protocol-less identifier did not form a valid URL once completed
    #[error("{0:?} is not a valid URL")]
    InvalidUrl(String),

    /// The manifest declares a negative format version
    #[error("ffcss version cannot be negative but is set to {0}")]
    NegativeFormatVersion(i64),

    /// The theme name is reserved or is not a single directory name
    #[error("invalid theme name {0:?}")]
    ReservedThemeName(String),

    /// Neither an explicit name nor a GitHub download location was given
    #[error("theme has no name")]
    MissingName,

    /// An `os` key is not one of the recognized operating systems
    #[error("{0} is not a valid os replacement target. Targets are macos, windows and linux")]
    InvalidOsKey(String),

    /// A variant name is reserved or is not a single directory name
    #[error("invalid variant name {0:?}")]
    ReservedVariantName(String),

    /// Catalog lookup miss with a close match
    #[error("theme {query:?} not found. did you mean {suggestion}?")]
    NotFoundWithSuggestion { query: String, suggestion: String },

    /// Catalog lookup miss
    #[error("theme {0:?} not found")]
    NotFound(String),

    /// A cloned repository has no manifest at its root
    #[error("no manifest found at {}", .0.display())]
    ManifestNotFound(PathBuf),

    /// An extracted zip file has no manifest anywhere
    #[error("downloaded zip file has no manifest file (ffcss.yaml)")]
    ArchiveWithoutManifest,

    /// The theme to be cached resolves to an empty name
    #[error("manifest has no name")]
    UnnamedManifest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ThemeError::NotFoundWithSuggestion {
            query: "baaaa con".to_string(),
            suggestion: "bacon".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "theme \"baaaa con\" not found. did you mean bacon?"
        );

        let err = ThemeError::InvalidOsKey("MacOS".to_string());
        assert_eq!(
            err.to_string(),
            "MacOS is not a valid os replacement target. Targets are macos, windows and linux"
        );

        let err = ThemeError::ReservedVariantName("_".to_string());
        assert_eq!(err.to_string(), "invalid variant name \"_\"");
    }

    #[test]
    fn test_error_converts_to_anyhow() {
        let err: anyhow::Error = ThemeError::MissingName.into();
        assert_eq!(
            err.downcast_ref::<ThemeError>(),
            Some(&ThemeError::MissingName)
        );
    }
}
