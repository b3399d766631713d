//! Locally-known themes and name lookup
//!
//! The catalog is a directory of manifests (`<config>/themes/*.yaml`), keyed
//! by file stem. Lookups compare normalized names, and suggest the closest
//! theme name when nothing matches exactly.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

use crate::error::ThemeError;
use crate::manifest::{Session, Theme};

/// Minimum similarity for a theme name to be suggested
pub const DEFAULT_THRESHOLD: f64 = 0.75;

/// Scores how alike two strings are, from 0 (nothing in common) to 1
/// (identical)
pub trait Similarity {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// Jaro-Winkler similarity. Favors shared prefixes and tolerates repeated
/// letters, which is what typos in theme names mostly look like.
#[derive(Debug, Default, Clone, Copy)]
pub struct JaroWinkler;

impl Similarity for JaroWinkler {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        strsim::jaro_winkler(a, b)
    }
}

/// Levenshtein distance scaled by the length of the longer string
#[derive(Debug, Default, Clone, Copy)]
pub struct NormalizedLevenshtein;

impl Similarity for NormalizedLevenshtein {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b)
    }
}

/// Canonical form of a theme name for comparisons: separators (`-`, `_`,
/// spaces and dots) removed, compatibility-decomposed, lower-cased.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' ' | '.'))
        .nfkd()
        .collect::<String>()
        .to_lowercase()
}

/// Themes keyed by the file stem of their manifest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    themes: BTreeMap<String, Theme>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, theme: Theme) {
        self.themes.insert(key.into(), theme);
    }

    pub fn get(&self, key: &str) -> Option<&Theme> {
        self.themes.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Theme)> {
        self.themes.iter().map(|(key, theme)| (key.as_str(), theme))
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    /// Find a theme by its declared name, see [`Catalog::lookup_with`]
    pub fn lookup(&self, query: &str) -> Result<&Theme, ThemeError> {
        self.lookup_with(query, &JaroWinkler, DEFAULT_THRESHOLD)
    }

    /// Find the theme whose normalized name equals the normalized `query`.
    ///
    /// Catalog keys are not considered, only the names manifests declare.
    /// When nothing matches, the error suggests the most similar name
    /// scoring at least `threshold`, if any.
    pub fn lookup_with(
        &self,
        query: &str,
        similarity: &dyn Similarity,
        threshold: f64,
    ) -> Result<&Theme, ThemeError> {
        let wanted = normalize(query);
        tracing::debug!("Looking up {:?} as {:?}", query, wanted);

        if let Some(theme) = self
            .themes
            .values()
            .find(|theme| normalize(&theme.name()) == wanted)
        {
            return Ok(theme);
        }

        let suggestion = self
            .themes
            .values()
            .map(|theme| {
                let name = theme.name();
                let score = similarity.similarity(&wanted, &normalize(&name));
                tracing::trace!("{:?} scores {:.3}", name, score);
                (name, score)
            })
            .filter(|(_, score)| *score >= threshold)
            .max_by(|(_, a), (_, b)| a.total_cmp(b));

        match suggestion {
            Some((name, _)) => Err(ThemeError::NotFoundWithSuggestion {
                query: query.to_string(),
                suggestion: name,
            }),
            None => Err(ThemeError::NotFound(query.to_string())),
        }
    }
}

impl FromIterator<(String, Theme)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (String, Theme)>>(iter: I) -> Self {
        Self {
            themes: iter.into_iter().collect(),
        }
    }
}

/// Stem of a catalog manifest file name, `None` for other files
fn manifest_stem(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(".yaml")
        .or_else(|| file_name.strip_suffix(".yml"))
        .filter(|stem| !stem.is_empty())
}

impl Session {
    /// Load every manifest of the catalog directory `dir`
    pub fn load_catalog(&mut self, dir: &Path) -> Result<Catalog> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("couldn't read catalog directory {}", dir.display()))?;

        let mut file_names = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("couldn't read catalog directory {}", dir.display()))?;
            file_names.push(entry.file_name().to_string_lossy().into_owned());
        }
        file_names.sort();
        tracing::debug!("Loading potential themes {:?} into catalog", file_names);

        let mut catalog = Catalog::new();
        for file_name in &file_names {
            let Some(stem) = manifest_stem(file_name) else {
                continue;
            };
            let theme = self
                .load_manifest(&dir.join(file_name))
                .with_context(|| format!("while loading theme {stem:?}"))?;
            tracing::debug!("Adding theme from manifest {:?}", file_name);
            catalog.insert(stem, theme);
        }
        Ok(catalog)
    }
}
