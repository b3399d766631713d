use serde::{Deserialize, Serialize};

use super::{lenient, Config, FileTemplate, Theme};

/// Hook overrides of a variant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantHooks {
    #[serde(
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub before: Option<String>,
    #[serde(
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub after: Option<String>,
}

impl VariantHooks {
    pub fn is_empty(&self) -> bool {
        self.before.is_none() && self.after.is_none()
    }
}

/// A named set of overrides on top of a theme.
///
/// `None` leaves the theme's value alone; `Some` replaces it, even when
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Variant {
    /// Key of the variant in the manifest's `variants` map
    #[serde(skip)]
    pub name: String,

    #[serde(
        rename = "download",
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub download_at: Option<String>,

    #[serde(
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub branch: Option<String>,

    #[serde(
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub commit: Option<String>,

    #[serde(
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub tag: Option<String>,

    /// Merged into the theme's config, entry by entry
    #[serde(skip_serializing_if = "Config::is_empty")]
    pub config: Config,

    #[serde(rename = "userChrome", skip_serializing_if = "Option::is_none")]
    pub user_chrome: Option<FileTemplate>,

    #[serde(rename = "userContent", skip_serializing_if = "Option::is_none")]
    pub user_content: Option<FileTemplate>,

    #[serde(rename = "user.js", skip_serializing_if = "Option::is_none")]
    pub user_js: Option<FileTemplate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<Vec<FileTemplate>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub addons: Option<Vec<String>>,

    #[serde(skip_serializing_if = "VariantHooks::is_empty")]
    pub run: VariantHooks,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// What has to happen to a theme's cached files once a variant is applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariantActions {
    /// The variant downloads from somewhere else
    pub needs_redownload: bool,
    /// The variant lives on another branch of the same repository
    pub needs_branch_switch: bool,
}

impl VariantActions {
    pub fn any(&self) -> bool {
        self.needs_redownload || self.needs_branch_switch
    }
}

fn replace_with<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

impl Theme {
    /// A copy of the theme with `variant` applied, and what the caller must
    /// do for the theme's files to match.
    pub fn with_variant(&self, variant: &Variant) -> (Theme, VariantActions) {
        let mut theme = self.clone();
        let mut actions = VariantActions::default();

        theme.current_variant = variant.name.clone();

        replace_with(&mut theme.user_chrome, &variant.user_chrome);
        replace_with(&mut theme.user_content, &variant.user_content);
        replace_with(&mut theme.user_js, &variant.user_js);
        replace_with(&mut theme.assets, &variant.assets);
        replace_with(&mut theme.addons, &variant.addons);
        replace_with(&mut theme.message, &variant.message);
        replace_with(&mut theme.run.before, &variant.run.before);
        replace_with(&mut theme.run.after, &variant.run.after);
        replace_with(&mut theme.commit, &variant.commit);
        replace_with(&mut theme.tag, &variant.tag);

        theme.config.extend(
            variant
                .config
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );

        if let Some(download_at) = variant.download_at.as_ref().filter(|d| !d.is_empty()) {
            theme.download_at = download_at.clone();
            actions.needs_redownload = true;
        }
        if let Some(branch) = variant.branch.as_ref().filter(|b| !b.is_empty()) {
            theme.branch = branch.clone();
            actions.needs_branch_switch = true;
        }

        if actions.any() {
            theme.refresh_cache_path();
        }

        (theme, actions)
    }
}
