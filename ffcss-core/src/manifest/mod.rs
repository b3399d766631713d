//! Theme manifest parsing (ffcss.yaml)
//!
//! A manifest describes a FirefoxCSS theme: where to download it, which
//! files to install, which `about:config` entries to set, and optional
//! variants overriding any of those.

mod generate;
mod lenient;
mod variant;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ThemeError;
use crate::paths::{DataDirs, ROOT_VARIANT_NAME, TEMP_DOWNLOADS_DIR_NAME};
use crate::version::{FirefoxVersion, FirefoxVersionConstraint};

pub use generate::MANIFEST_HEADER;
pub use variant::{Variant, VariantActions, VariantHooks};

/// File name of a theme's manifest, at the root of its repository or archive
pub const MANIFEST_FILE_NAME: &str = "ffcss.yaml";

/// Preference every theme needs for Firefox to load `userChrome.css`
pub const STYLESHEETS_PREF: &str = "toolkit.legacyUserProfileCustomizations.stylesheets";

/// Valid keys of the `os` entry
pub const VALID_OS_NAMES: &[&str] = &["linux", "macos", "windows"];

/// Prefix of download locations the theme name can be guessed from
const GITHUB_PREFIX: &str = "https://github.com";

/// `about:config` entries to set, keyed by preference name
pub type Config = BTreeMap<String, serde_json::Value>;

/// A path with `{{placeholders}}` rendered at install time
pub type FileTemplate = String;

/// Shell commands run around installation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hooks {
    pub before: String,
    pub after: String,
}

/// A FirefoxCSS theme, read from a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// Major version of ffcss the manifest was written for
    #[serde(rename = "ffcss")]
    pub ffcss_version: i64,

    /// Supported Firefox versions, parsed into [`Theme::firefox_constraint`]
    #[serde(
        rename = "firefox",
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub firefox_version: Option<String>,

    #[serde(rename = "name", deserialize_with = "lenient::string")]
    pub explicit_name: String,

    #[serde(rename = "by")]
    pub author: String,

    pub description: String,

    pub variants: BTreeMap<String, Variant>,

    /// OS name replacements for templates. An empty replacement marks the
    /// OS as unsupported.
    #[serde(rename = "os", skip_serializing_if = "BTreeMap::is_empty")]
    pub os_names: BTreeMap<String, String>,

    #[serde(rename = "download", deserialize_with = "lenient::string")]
    pub download_at: String,

    #[serde(deserialize_with = "lenient::string")]
    pub branch: String,

    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub commit: String,

    #[serde(deserialize_with = "lenient::string", skip_serializing_if = "String::is_empty")]
    pub tag: String,

    #[serde(skip_serializing_if = "Config::is_empty")]
    pub config: Config,

    #[serde(rename = "userChrome")]
    pub user_chrome: FileTemplate,

    #[serde(rename = "userContent")]
    pub user_content: FileTemplate,

    #[serde(rename = "user.js")]
    pub user_js: FileTemplate,

    pub assets: Vec<FileTemplate>,

    /// Re-roots asset destinations: assets are copied relative to this path
    #[serde(rename = "copy from", skip_serializing_if = "String::is_empty")]
    pub copy_from: String,

    pub addons: Vec<String>,

    pub run: Hooks,

    /// Shown to the user once the theme is installed
    pub message: String,

    #[serde(skip)]
    firefox_constraint: Option<FirefoxVersionConstraint>,

    #[serde(skip)]
    current_variant: String,

    #[serde(skip)]
    raw: String,

    #[serde(skip)]
    cache_root: PathBuf,

    /// Directory the theme's files are cached in
    #[serde(skip)]
    pub downloaded_to: PathBuf,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

impl Theme {
    /// A blank theme with the defaults every theme needs
    pub fn new() -> Self {
        let mut config = Config::new();
        config.insert(STYLESHEETS_PREF.to_string(), serde_json::Value::Bool(true));

        Self {
            ffcss_version: 0,
            firefox_version: None,
            explicit_name: String::new(),
            author: String::new(),
            description: String::new(),
            variants: BTreeMap::new(),
            os_names: BTreeMap::new(),
            download_at: String::new(),
            branch: String::new(),
            commit: String::new(),
            tag: String::new(),
            config,
            user_chrome: String::new(),
            user_content: String::new(),
            user_js: String::new(),
            assets: Vec::new(),
            copy_from: String::new(),
            addons: Vec::new(),
            run: Hooks::default(),
            message: String::new(),
            firefox_constraint: None,
            current_variant: ROOT_VARIANT_NAME.to_string(),
            raw: String::new(),
            cache_root: PathBuf::new(),
            downloaded_to: PathBuf::new(),
        }
    }

    /// The theme's name.
    ///
    /// The explicit `name` entry when set, otherwise the repository name of a
    /// GitHub download location, otherwise the empty string. Always
    /// lower-cased.
    pub fn name(&self) -> String {
        if !self.explicit_name.is_empty() {
            return self.explicit_name.to_lowercase();
        }
        if self.download_at.starts_with(GITHUB_PREFIX) {
            return self
                .download_at
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_lowercase();
        }
        String::new()
    }

    /// Name of the applied variant, `_` when none is
    pub fn current_variant(&self) -> &str {
        &self.current_variant
    }

    /// The manifest's source text, empty for themes not read from a file
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn firefox_constraint(&self) -> Option<&FirefoxVersionConstraint> {
        self.firefox_constraint.as_ref()
    }

    /// Whether the theme declares support for `version`. Themes without a
    /// `firefox` entry support every version.
    pub fn supports_firefox(&self, version: &FirefoxVersion) -> bool {
        self.firefox_constraint
            .as_ref()
            .map_or(true, |constraint| constraint.fulfilled_by(version))
    }

    /// Variant names, in alphabetical order
    pub fn available_variants(&self) -> Vec<&str> {
        self.variants.keys().map(String::as_str).collect()
    }

    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.get(name)
    }

    /// Render the theme's config as `user.js` source
    pub fn user_js_content(&self) -> Result<String> {
        crate::prefs::user_js_content(&self.config)
    }

    /// Warn when the manifest marks `operating_system` as unsupported.
    /// Returns whether it does.
    pub fn warn_if_incompatible_with_os(&self, operating_system: &str) -> bool {
        let incompatible = self
            .os_names
            .get(operating_system)
            .is_some_and(|replacement| replacement.is_empty());
        if incompatible {
            tracing::warn!(
                "This theme is marked as incompatible with {}. Things might not work.",
                operating_system
            );
        }
        incompatible
    }

    /// Where the theme's files belong given its current name and variant
    pub fn expected_cache_path(&self) -> PathBuf {
        self.cache_root.join(self.name()).join(&self.current_variant)
    }

    pub(crate) fn set_cache_root(&mut self, cache_root: &Path) {
        self.cache_root = cache_root.to_path_buf();
    }

    pub(crate) fn refresh_cache_path(&mut self) {
        self.downloaded_to = self.expected_cache_path();
    }
}

/// Whether `name` can be used as one directory name inside the cache
pub fn is_single_path_component(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Name of the running operating system as used by the `os` entry
pub fn current_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "macos",
        "windows" => "windows",
        "linux" => "linux",
        other => other,
    }
}

/// Per-run loading state
///
/// Carries the data directories themes are cached under and whether the
/// format version warning has already been shown during this run.
#[derive(Debug, Clone)]
pub struct Session {
    dirs: DataDirs,
    compat_warning_shown: bool,
}

impl Session {
    pub fn new(dirs: DataDirs) -> Self {
        Self {
            dirs,
            compat_warning_shown: false,
        }
    }

    pub fn dirs(&self) -> &DataDirs {
        &self.dirs
    }

    pub fn compat_warning_shown(&self) -> bool {
        self.compat_warning_shown
    }

    /// Load a manifest file into a [`Theme`]
    pub fn load_manifest(&mut self, path: &Path) -> Result<Theme> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("while reading manifest {}", path.display()))?;

        self.parse_manifest(&raw)
            .with_context(|| format!("while parsing manifest {}", path.display()))
    }

    /// Parse and validate manifest source text
    pub fn parse_manifest(&mut self, raw: &str) -> Result<Theme> {
        let mut theme: Theme = if raw.trim().is_empty() {
            Theme::new()
        } else {
            serde_yaml_ng::from_str(raw).context("invalid YAML")?
        };
        theme.raw = raw.to_string();
        // A `config` entry replaces the map wholesale; put the mandatory
        // preference back unless the manifest sets it itself.
        theme
            .config
            .entry(STYLESHEETS_PREF.to_string())
            .or_insert(serde_json::Value::Bool(true));

        if theme.ffcss_version < 0 {
            return Err(ThemeError::NegativeFormatVersion(theme.ffcss_version).into());
        }

        if theme.ffcss_version != 0
            && theme.ffcss_version != crate::version_major()
            && !self.compat_warning_shown
        {
            tracing::warn!(
                "ffcss {} is installed, but you are using a theme made for ffcss {}.X.X. Some things may not work.",
                crate::VERSION,
                theme.ffcss_version
            );
            self.compat_warning_shown = true;
        }

        let name = theme.name();
        if name == TEMP_DOWNLOADS_DIR_NAME {
            return Err(ThemeError::ReservedThemeName(name).into());
        }
        if name.is_empty() {
            return Err(ThemeError::MissingName.into());
        }
        if !is_single_path_component(&name) {
            return Err(ThemeError::ReservedThemeName(name).into());
        }

        if let Some(key) = theme
            .os_names
            .keys()
            .find(|key| !VALID_OS_NAMES.contains(&key.as_str()))
        {
            return Err(ThemeError::InvalidOsKey(key.clone()).into());
        }

        if theme.variants.contains_key(ROOT_VARIANT_NAME) {
            return Err(ThemeError::ReservedVariantName(ROOT_VARIANT_NAME.to_string()).into());
        }
        if let Some(key) = theme
            .variants
            .keys()
            .find(|key| !is_single_path_component(key))
        {
            return Err(ThemeError::ReservedVariantName(key.clone()).into());
        }
        for (name, variant) in theme.variants.iter_mut() {
            variant.name = name.clone();
        }
        theme.current_variant = ROOT_VARIANT_NAME.to_string();

        if let Some(text) = &theme.firefox_version {
            let constraint = text
                .parse()
                .with_context(|| format!("invalid Firefox version constraint {text:?}"))?;
            theme.firefox_constraint = Some(constraint);
        }

        theme.set_cache_root(self.dirs.cache_root());
        theme.refresh_cache_path();
        Ok(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const FINE: &str = r#"
ffcss: 0
firefox: 89+
name: a fine theme
by: some nice person
description: |
  Lorem ipsum _dolor_ sit am**et**

variants:
  default: {}
  new moon:
    name: this is ignored
    download: https://example.com/new-moon

os:
  linux: GNU+Linux

download: https://example.com/.git
branch: sun
commit: 85dfe1ac
tag: v0.184.668

config:
  legacy.some-config-entry: yeees
  zincoxide: true

userChrome: userChrome.sass
userContent: ./{{os}}/userContent--{{variant}}.css
user.js: user.ls
assets:
  - chrome/**
  - logos/*.svg
copy from: chromeee/
addons:
  - https://example.com/extensions/a
  - https://example.com/extensions/b

run:
  before: cd /; tree; echo you have been hacked
  after: echo hacking complete

message: |
  Here's a choccy milk :)
"#;

    fn session() -> Session {
        Session::new(DataDirs::new("/home/me/.cache/ffcss", "/home/me/.config/ffcss"))
    }

    fn parse_error(yaml: &str) -> String {
        let err = session().parse_manifest(yaml).unwrap_err();
        format!("{err:#}")
    }

    #[test]
    fn test_new_theme_defaults() {
        let theme = Theme::new();
        assert_eq!(theme.config.len(), 1);
        assert_eq!(theme.config[STYLESHEETS_PREF], json!(true));
        assert!(theme.variants.is_empty());
        assert!(theme.assets.is_empty());
        assert_eq!(theme.current_variant(), ROOT_VARIANT_NAME);
    }

    #[test]
    fn test_parse_full_manifest() {
        let theme = session().parse_manifest(FINE).unwrap();

        assert_eq!(theme.name(), "a fine theme");
        assert_eq!(theme.author, "some nice person");
        assert_eq!(theme.description, "Lorem ipsum _dolor_ sit am**et**\n");
        assert_eq!(theme.raw(), FINE);
        assert_eq!(theme.current_variant(), ROOT_VARIANT_NAME);
        assert_eq!(
            theme.downloaded_to,
            PathBuf::from("/home/me/.cache/ffcss/a fine theme/_")
        );

        let constraint = theme.firefox_constraint().unwrap();
        assert_eq!(constraint.min, FirefoxVersion::any_minor(89));
        assert_eq!(constraint.max, FirefoxVersion::INFINITY);
        assert_eq!(constraint.sentence, "version 89.x or higher");

        assert_eq!(theme.available_variants(), vec!["default", "new moon"]);
        assert_eq!(theme.variant("default").unwrap().name, "default");
        let new_moon = theme.variant("new moon").unwrap();
        assert_eq!(new_moon.name, "new moon");
        assert_eq!(
            new_moon.download_at.as_deref(),
            Some("https://example.com/new-moon")
        );

        assert_eq!(theme.os_names["linux"], "GNU+Linux");
        assert_eq!(theme.download_at, "https://example.com/.git");
        assert_eq!(theme.branch, "sun");
        assert_eq!(theme.commit, "85dfe1ac");
        assert_eq!(theme.tag, "v0.184.668");

        let mut expected_config = Config::new();
        expected_config.insert("legacy.some-config-entry".to_string(), json!("yeees"));
        expected_config.insert(STYLESHEETS_PREF.to_string(), json!(true));
        expected_config.insert("zincoxide".to_string(), json!(true));
        assert_eq!(theme.config, expected_config);

        assert_eq!(theme.user_chrome, "userChrome.sass");
        assert_eq!(theme.user_content, "./{{os}}/userContent--{{variant}}.css");
        assert_eq!(theme.user_js, "user.ls");
        assert_eq!(theme.assets, vec!["chrome/**", "logos/*.svg"]);
        assert_eq!(theme.copy_from, "chromeee/");
        assert_eq!(theme.addons.len(), 2);
        assert_eq!(
            theme.run,
            Hooks {
                before: "cd /; tree; echo you have been hacked".to_string(),
                after: "echo hacking complete".to_string(),
            }
        );
        assert_eq!(theme.message, "Here's a choccy milk :)\n");
    }

    #[test]
    fn test_name_from_github_download() {
        let theme = session()
            .parse_manifest("download: https://github.com/muckSponge/MaterialFox\n")
            .unwrap();
        assert_eq!(theme.name(), "materialfox");
        assert!(theme.downloaded_to.ends_with("materialfox/_"));
    }

    #[test]
    fn test_explicit_name_is_lowercased() {
        let theme = session().parse_manifest("name: Bacon\n").unwrap();
        assert_eq!(theme.name(), "bacon");
    }

    #[test]
    fn test_numeric_scalars_are_accepted_as_strings() {
        let theme = session()
            .parse_manifest("name: 1984\nfirefox: 90\ncommit: 12345678\n")
            .unwrap();
        assert_eq!(theme.name(), "1984");
        assert_eq!(theme.firefox_version.as_deref(), Some("90"));
        assert_eq!(theme.commit, "12345678");
    }

    #[test]
    fn test_stylesheets_pref_can_be_overridden() {
        let theme = session()
            .parse_manifest(&format!("name: x\nconfig:\n  {STYLESHEETS_PREF}: false\n"))
            .unwrap();
        assert_eq!(theme.config[STYLESHEETS_PREF], json!(false));
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            ("name: x\nffcss: -1\n", "ffcss version cannot be negative"),
            ("name: x\nfirefox: 98-30\n", "invalid Firefox version constraint"),
            ("by: nobody\n", "theme has no name"),
            ("", "theme has no name"),
            ("name: .download\n", "invalid theme name \".download\""),
            (
                "download: https://github.com/someone/.download\n",
                "invalid theme name \".download\"",
            ),
            ("name: ../../etc\n", "invalid theme name \"../../etc\""),
            ("name: 'a\\b'\n", "invalid theme name \"a\\\\b\""),
            (
                "download: https://github.com/someone/..\n",
                "invalid theme name \"..\"",
            ),
            ("name: x\nvariants:\n  _: {}\n", "invalid variant name \"_\""),
            (
                "name: x\nvariants:\n  ../../up: {}\n",
                "invalid variant name \"../../up\"",
            ),
            ("name: x\nvariants:\n  .: {}\n", "invalid variant name \".\""),
            (
                "name: x\nos:\n  hannah montana: hm\n",
                "hannah montana is not a valid os replacement target. Targets are macos, windows and linux",
            ),
            (
                "name: x\nos:\n  MacOS: mac\n",
                "MacOS is not a valid os replacement target. Targets are macos, windows and linux",
            ),
            ("name: x\nassets: 3\n", "invalid YAML"),
        ];

        for (yaml, expected) in cases {
            let message = parse_error(yaml);
            assert!(
                message.contains(expected),
                "{yaml:?} should fail with {expected:?}, got {message:?}"
            );
        }
    }

    #[test]
    fn test_compat_warning_shown_once() {
        let mut session = session();
        let future = format!("name: x\nffcss: {}\n", crate::version_major() + 99);

        assert!(!session.compat_warning_shown());
        session.parse_manifest("name: x\n").unwrap();
        assert!(!session.compat_warning_shown());

        session.parse_manifest(&future).unwrap();
        assert!(session.compat_warning_shown());

        // Still loads, and the flag stays set
        session.parse_manifest(&future).unwrap();
        assert!(session.compat_warning_shown());
    }

    #[test]
    fn test_load_manifest_from_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(MANIFEST_FILE_NAME);
        std::fs::write(&path, "name: bacon\nfirefox: up to 90\n").unwrap();

        let theme = session().load_manifest(&path).unwrap();
        assert_eq!(theme.name(), "bacon");
        assert!(theme.supports_firefox(&FirefoxVersion::new(90, 1)));
        assert!(!theme.supports_firefox(&FirefoxVersion::new(91, 0)));
    }

    #[test]
    fn test_load_missing_manifest() {
        let err = session()
            .load_manifest(Path::new("/definitely/not/here/ffcss.yaml"))
            .unwrap_err();
        assert!(err.to_string().contains("while reading manifest"));
    }

    #[test]
    fn test_os_incompatibility() {
        let theme = session()
            .parse_manifest("name: x\nos:\n  windows: ''\n  linux: GNU+Linux\n")
            .unwrap();
        assert!(theme.warn_if_incompatible_with_os("windows"));
        assert!(!theme.warn_if_incompatible_with_os("linux"));
        assert!(!theme.warn_if_incompatible_with_os("macos"));
    }

    #[test]
    fn test_user_js_content_includes_defaults() {
        let theme = session().parse_manifest("name: x\n").unwrap();
        assert_eq!(
            theme.user_js_content().unwrap(),
            format!("user_pref(\"{STYLESHEETS_PREF}\", true);")
        );
    }
}
