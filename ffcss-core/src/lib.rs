//! ffcss core library
//!
//! Resolves a theme identifier (catalog name, `owner/repo`, URL) into a
//! locally cached, fully parsed FirefoxCSS theme.

pub mod acquire;
pub mod catalog;
pub mod current;
pub mod error;
pub mod git;
pub mod http;
pub mod manifest;
pub mod paths;
pub mod prefs;
pub mod process;
pub mod profiles;
pub mod resolver;
pub mod version;

pub use acquire::Acquirer;
pub use catalog::{normalize, Catalog, JaroWinkler, NormalizedLevenshtein, Similarity};
pub use error::ThemeError;
pub use manifest::{Session, Theme, Variant, VariantActions};
pub use paths::DataDirs;
pub use profiles::{FirefoxProfile, IncompatibleProfile};
pub use resolver::{resolve_source, SourceKind};
pub use version::{FirefoxVersion, FirefoxVersionConstraint};

/// Full version string of this tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Major component of this tool's version, compared against the `ffcss`
/// entry of manifests.
pub fn version_major() -> i64 {
    env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0)
}
