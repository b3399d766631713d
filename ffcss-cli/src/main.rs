use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing_subscriber::EnvFilter;

use ffcss_core::current::CurrentThemes;
use ffcss_core::git::Git;
use ffcss_core::manifest::MANIFEST_FILE_NAME;
use ffcss_core::manifest::current_os;
use ffcss_core::process::SystemRunner;
use ffcss_core::profiles::profiles;
use ffcss_core::version::profile_firefox_version;
use ffcss_core::{Acquirer, DataDirs, Session, Theme};

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Part of the version number to print
#[derive(Debug, Clone, ValueEnum)]
enum VersionPart {
    Major,
    Minor,
    Patch,
}

#[derive(Parser, Debug)]
#[clap(
    name = "ffcss",
    about = "Download and configure FirefoxCSS themes",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Override the cache directory (default: ~/.cache/ffcss)
    #[clap(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Override the configuration directory (default: ~/.config/ffcss)
    #[clap(long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Download a theme into the cache
    Get {
        /// Catalog name, OWNER/REPO, DOMAIN.TLD/PATH or URL
        theme: String,

        /// Variant to apply
        variant: Option<String>,
    },

    /// List the themes of the local catalog
    Catalog,

    /// Check whether a catalog theme supports the Firefox version of your
    /// profiles
    Check {
        /// Catalog name of the theme
        theme: String,

        /// Check only this profile directory
        #[clap(long)]
        profile: Option<PathBuf>,

        /// Folder holding the profiles (default: the usual one for your OS)
        #[clap(long, conflicts_with = "profile")]
        profiles_dir: Option<PathBuf>,
    },

    /// Write a manifest for the theme in the current directory
    Init {
        /// Overwrite an existing manifest
        #[clap(long)]
        force: bool,
    },

    /// Show the theme applied to each profile
    Current,

    /// Manage the theme cache
    Cache {
        #[clap(subcommand)]
        command: CacheCommand,
    },

    /// Print the version of ffcss
    Version {
        #[clap(value_enum)]
        part: Option<VersionPart>,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Remove cached themes
    Clear {
        /// Only remove leftovers of interrupted downloads
        #[clap(long)]
        downloads: bool,
    },
}

/// Table row for catalog themes
#[derive(Tabled)]
struct CatalogRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Firefox")]
    firefox: String,
    #[tabled(rename = "Variants")]
    variants: String,
    #[tabled(rename = "Download")]
    download: String,
}

/// Table row for profiles a theme does not support
#[derive(Tabled)]
struct IncompatibleRow {
    #[tabled(rename = "Profile")]
    profile: String,
    #[tabled(rename = "Firefox")]
    version: String,
}

/// Table row for current themes
#[derive(Tabled)]
struct CurrentRow {
    #[tabled(rename = "Profile")]
    profile: String,
    #[tabled(rename = "Theme")]
    theme: String,
}

/// Initialize tracing from --log-level. Logs go to stderr.
fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::new(log_level.to_filter_directive());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_tracing(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error:");
            for (depth, cause) in err.chain().enumerate() {
                eprintln!("{}{}. {}", "  ".repeat(depth + 1), depth + 1, cause);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let dirs = DataDirs::discover_with_overrides(cli.cache_dir, cli.config_dir)?;

    match cli.command {
        Command::Get { theme, variant } => get(dirs, &theme, variant.as_deref()),
        Command::Catalog => list_catalog(dirs),
        Command::Check {
            theme,
            profile: Some(profile),
            ..
        } => check(dirs, &theme, &profile),
        Command::Check {
            theme,
            profile: None,
            profiles_dir,
        } => check_all_profiles(dirs, &theme, profiles_dir.as_deref()),
        Command::Init { force } => init(force),
        Command::Current => list_current(&dirs),
        Command::Cache { command } => match command {
            CacheCommand::Clear { downloads: true } => {
                dirs.clean_download_area()?;
                println!("Removed unfinished downloads");
                Ok(())
            }
            CacheCommand::Clear { downloads: false } => {
                dirs.clear_whole_cache()?;
                println!("Cleared {}", dirs.cache_root().display());
                Ok(())
            }
        },
        Command::Version { part } => {
            let version = ffcss_core::VERSION;
            let mut parts = version.split('.');
            let printed = match part {
                None => Some(version),
                Some(VersionPart::Major) => parts.next(),
                Some(VersionPart::Minor) => parts.nth(1),
                Some(VersionPart::Patch) => parts.nth(2),
            };
            println!("{}", printed.unwrap_or_default());
            Ok(())
        }
    }
}

fn get(dirs: DataDirs, name: &str, variant_name: Option<&str>) -> Result<()> {
    dirs.create_all()?;
    let mut acquirer = Acquirer::new(Session::new(dirs))?;

    let (location, kind) = acquirer
        .resolve(name)
        .with_context(|| format!("while resolving {name:?}"))?;
    tracing::debug!("Resolved {} to {} ({})", name, location, kind);

    let mut theme = acquirer
        .acquire(&location, kind, None)
        .with_context(|| format!("while downloading {name:?}"))?;
    theme.warn_if_incompatible_with_os(current_os());

    if let Some(variant_name) = variant_name {
        let variant = theme.variant(variant_name).with_context(|| {
            format!(
                "theme {} has no variant {:?}. Available variants: {}",
                theme.name(),
                variant_name,
                theme.available_variants().join(", ")
            )
        })?;
        let (applied, actions) = theme.with_variant(variant);
        theme = acquirer.reacquire_if_needed(applied, actions)?;
    }

    println!("{}", theme.downloaded_to.display());
    if !theme.message.trim().is_empty() {
        println!("\n{}", theme.message.trim_end());
    }
    Ok(())
}

fn list_catalog(dirs: DataDirs) -> Result<()> {
    let catalog_dir = dirs.catalog_dir();
    if !catalog_dir.is_dir() {
        println!("No catalog at {}", catalog_dir.display());
        return Ok(());
    }

    let catalog = Session::new(dirs)
        .load_catalog(&catalog_dir)
        .context("while loading catalog of themes")?;
    if catalog.is_empty() {
        println!("No themes in {}", catalog_dir.display());
        return Ok(());
    }

    let rows: Vec<CatalogRow> = catalog
        .iter()
        .map(|(key, theme)| CatalogRow {
            key: key.to_string(),
            name: theme.name(),
            firefox: theme
                .firefox_constraint()
                .map(|c| c.sentence.clone())
                .unwrap_or_else(|| "any".to_string()),
            variants: theme.available_variants().join(", "),
            download: theme.download_at.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");
    Ok(())
}

fn check(dirs: DataDirs, name: &str, profile: &Path) -> Result<()> {
    let catalog_dir = dirs.catalog_dir();
    let catalog = Session::new(dirs)
        .load_catalog(&catalog_dir)
        .context("while loading catalog of themes")?;
    let theme = catalog.lookup(name)?;

    let version = profile_firefox_version(profile)
        .with_context(|| format!("couldn't get the Firefox version of {}", profile.display()))?;

    match theme.firefox_constraint() {
        None => println!(
            "{} does not restrict Firefox versions, profile runs {}",
            theme.name(),
            version
        ),
        Some(constraint) if constraint.fulfilled_by(&version) => println!(
            "{} supports Firefox {}, profile runs {}",
            theme.name(),
            constraint.sentence,
            version
        ),
        Some(constraint) => anyhow::bail!(
            "{} only supports Firefox {}, but the profile runs {}",
            theme.name(),
            constraint.sentence,
            version
        ),
    }
    Ok(())
}

fn check_all_profiles(dirs: DataDirs, name: &str, profiles_dir: Option<&Path>) -> Result<()> {
    let catalog_dir = dirs.catalog_dir();
    let catalog = Session::new(dirs)
        .load_catalog(&catalog_dir)
        .context("while loading catalog of themes")?;
    let theme = catalog.lookup(name)?;

    let found = profiles(profiles_dir)?;
    let incompatible = theme.incompatible_profiles(&found);
    if incompatible.is_empty() {
        println!(
            "{} supports the Firefox version of all {} profiles",
            theme.name(),
            found.len()
        );
        return Ok(());
    }

    let rows: Vec<IncompatibleRow> = incompatible
        .iter()
        .map(|entry| IncompatibleRow {
            profile: entry.profile.to_string(),
            version: entry.version.to_string(),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");

    let sentence = theme
        .firefox_constraint()
        .map(|c| c.sentence.clone())
        .unwrap_or_default();
    anyhow::bail!(
        "{} only supports Firefox {}, which {} of {} profiles do not run",
        theme.name(),
        sentence,
        incompatible.len(),
        found.len()
    )
}

fn init(force: bool) -> Result<()> {
    let working_dir = std::env::current_dir().context("could not get working directory")?;
    let manifest = working_dir.join(MANIFEST_FILE_NAME);
    if manifest.exists() && !force {
        anyhow::bail!(
            "{} already exists, use --force to overwrite it",
            manifest.display()
        );
    }

    let origin = Git::new(&SystemRunner).origin_url(&working_dir);
    let theme = Theme::initialize(&working_dir, origin.as_deref());
    let written = theme.write_manifest(&working_dir)?;
    println!("Wrote {}", written.display());
    Ok(())
}

fn list_current(dirs: &DataDirs) -> Result<()> {
    let current = CurrentThemes::load_from_path(&dirs.current_themes_file())?;
    if current.is_empty() {
        println!("No theme applied to any profile");
        return Ok(());
    }

    let rows: Vec<CurrentRow> = current
        .iter()
        .map(|(profile, theme)| CurrentRow {
            profile: profile.to_string(),
            theme: theme.to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        let cli = Cli::parse_from(["ffcss", "get", "ewen-lbh/bacon", "dark"]);
        match cli.command {
            Command::Get { theme, variant } => {
                assert_eq!(theme, "ewen-lbh/bacon");
                assert_eq!(variant.as_deref(), Some("dark"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_dirs() {
        let cli = Cli::parse_from([
            "ffcss",
            "catalog",
            "--cache-dir",
            "/tmp/c",
            "--config-dir",
            "/tmp/k",
        ]);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/c")));
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/k")));
    }

    #[test]
    fn test_cache_clear_downloads() {
        let cli = Cli::parse_from(["ffcss", "cache", "clear", "--downloads"]);
        assert!(matches!(
            cli.command,
            Command::Cache {
                command: CacheCommand::Clear { downloads: true }
            }
        ));
    }

    #[test]
    fn test_check_all_profiles() {
        let cli = Cli::parse_from(["ffcss", "check", "bacon", "--profiles-dir", "/tmp/p"]);
        match cli.command {
            Command::Check {
                theme,
                profile,
                profiles_dir,
            } => {
                assert_eq!(theme, "bacon");
                assert_eq!(profile, None);
                assert_eq!(profiles_dir, Some(PathBuf::from("/tmp/p")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_check_profile_and_profiles_dir_conflict() {
        let parsed = Cli::try_parse_from([
            "ffcss",
            "check",
            "bacon",
            "--profile",
            "/tmp/p/abcd1234.default",
            "--profiles-dir",
            "/tmp/p",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_init_force() {
        let cli = Cli::parse_from(["ffcss", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
    }
}
