//! Reading and writing Firefox `user_pref(...)` calls
//!
//! `prefs.js` and `user.js` are sequences of `user_pref("key", value);`
//! statements whose values are JSON literals.

use anyhow::{Context, Result};
use regex::Regex;

use crate::manifest::Config;

/// Value of the preference `key` in the contents of a `prefs.js` file.
///
/// When a key is assigned several times the last assignment wins, as it does
/// for Firefox itself. String values are returned without their quotes.
pub fn value_of_user_pref(prefs_content: &str, key: &str) -> Result<String> {
    let pattern = Regex::new(&format!(
        r#"(?m)^\s*user_pref\("{}"\s*,\s*(.+)\)\s*;?\s*$"#,
        regex::escape(key)
    ))
    .context("while building preference pattern")?;

    let raw = pattern
        .captures_iter(prefs_content)
        .last()
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim())
        .with_context(|| format!("key {key:?} not found"))?;

    let value: serde_json::Value = serde_json::from_str(raw)
        .with_context(|| format!("while interpreting value {raw:?}"))?;

    Ok(match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Render a config map as `user.js` source, one `user_pref` call per line
pub fn user_js_content(config: &Config) -> Result<String> {
    let mut lines = Vec::with_capacity(config.len());
    for (name, value) in config {
        let name_json = serde_json::to_string(name)?;
        let value_json = serde_json::to_string(value)
            .with_context(|| format!("can't serialize {value:?}"))?;
        lines.push(format!("user_pref({name_json}, {value_json});"));
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PREFS: &str = r#"// Mozilla User Preferences

user_pref("app.normandy.first_run", false);
user_pref("browser.startup.homepage_override.mstone", "88.0");
user_pref("browser.uidensity", 1);
   user_pref("browser.startup.homepage_override.mstone", "90.0.2")  ;
"#;

    #[test]
    fn test_last_assignment_wins() {
        let value = value_of_user_pref(PREFS, "browser.startup.homepage_override.mstone").unwrap();
        assert_eq!(value, "90.0.2");
    }

    #[test]
    fn test_non_string_values() {
        assert_eq!(value_of_user_pref(PREFS, "browser.uidensity").unwrap(), "1");
        assert_eq!(
            value_of_user_pref(PREFS, "app.normandy.first_run").unwrap(),
            "false"
        );
    }

    #[test]
    fn test_key_is_matched_literally() {
        let err = value_of_user_pref(PREFS, "browser.uidensit.").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_missing_key() {
        let err = value_of_user_pref(PREFS, "does.not.exist").unwrap_err();
        assert_eq!(err.to_string(), "key \"does.not.exist\" not found");
    }

    #[test]
    fn test_user_js_content() {
        let mut config = Config::new();
        config.insert(
            "toolkit.legacyUserProfileCustomizations.stylesheets".to_string(),
            json!(true),
        );
        config.insert("browser.uidensity".to_string(), json!(1));
        config.insert("svg.context-properties.content.enabled".to_string(), json!("yes"));

        let content = user_js_content(&config).unwrap();
        assert_eq!(
            content,
            [
                r#"user_pref("browser.uidensity", 1);"#,
                r#"user_pref("svg.context-properties.content.enabled", "yes");"#,
                r#"user_pref("toolkit.legacyUserProfileCustomizations.stylesheets", true);"#,
            ]
            .join("\n")
        );
    }
}
