use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name under `$HOME` holding persisted state and logs.
pub const APP_DIR_NAME: &str = ".billing-dash";

/// Fallback extract directory when neither `--data-dir` nor `--base-url` is set.
pub const DEFAULT_DATA_DIR: &str = "data";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Billing, payments and subscription metrics in the terminal
#[derive(Parser, Debug, Clone)]
#[command(
    name = "billing-dash",
    about = "Billing, payments and subscription metrics in the terminal",
    version
)]
pub struct Settings {
    /// Report view to open
    #[arg(long, default_value = "revenue", value_parser = ["revenue", "customers", "subscriptions", "payment", "financial"])]
    pub view: String,

    /// Start date (YYYY-MM-DD); defaults to the earliest record
    #[arg(long, value_parser = parse_date_arg)]
    pub start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD); defaults to the latest record
    #[arg(long, value_parser = parse_date_arg)]
    pub end: Option<NaiveDate>,

    /// Comma-separated columns for the raw data table
    #[arg(long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,

    /// Directory holding the CSV extracts
    #[arg(long, env = "BILLING_DASH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the bucket serving the CSV extracts (overrides --data-dir)
    #[arg(long, env = "BILLING_DASH_BASE_URL")]
    pub base_url: Option<String>,

    /// Output mode
    #[arg(long, default_value = "tui", value_parser = ["tui", "json"])]
    pub output: String,

    /// Timezone of naive timestamps in the extracts ("auto" = system)
    #[arg(long, default_value = "UTC", value_parser = parse_timezone_arg)]
    pub timezone: String,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Seconds a fetched extract is reused before refetching (0-3600)
    #[arg(long, default_value = "300", value_parser = clap::value_parser!(u64).range(0..=3600))]
    pub cache_ttl: u64,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

/// Where the extracts are fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Directory(PathBuf),
    Http(String),
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    crate::time_utils::parse_user_date(s).map_err(|e| e.to_string())
}

fn parse_timezone_arg(s: &str) -> Result<String, String> {
    if s == "auto" || crate::time_utils::validate_timezone(s) {
        Ok(s.to_string())
    } else {
        Err(format!("unknown timezone '{}' (expected an IANA name or \"auto\")", s))
    }
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.billing-dash/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl LastUsedParams {
    /// Default path of the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(APP_DIR_NAME).join("last_used.json")
    }

    /// Load persisted params; `Default` when the file is absent or corrupt.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable last-used params");
            Self::default()
        })
    }

    /// Atomically write params to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at `path` if it exists.
    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with explicit arguments and
    /// config path so tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "failed to clear saved configuration");
            }
            return settings.resolve_auto_values();
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins; dates and columns are never remembered.
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                settings.view = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }
        if settings.data_dir.is_none() {
            settings.data_dir = last.data_dir;
        }
        if settings.base_url.is_none() {
            settings.base_url = last.base_url;
        }

        settings = settings.resolve_auto_values();

        if let Err(e) = LastUsedParams::from(&settings).save_to(config_path) {
            tracing::debug!(error = %e, "could not persist last-used params");
        }

        settings
    }

    /// Resolve `"auto"` timezone and apply the `--debug` flag.
    fn resolve_auto_values(mut self) -> Self {
        if self.timezone == "auto" {
            self.timezone = crate::time_utils::get_system_timezone();
        }
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }

    /// Extract location: `--base-url` wins over `--data-dir`.
    pub fn source_location(&self) -> SourceLocation {
        if let Some(url) = self.base_url.as_ref().filter(|u| !u.trim().is_empty()) {
            return SourceLocation::Http(url.trim().to_string());
        }
        SourceLocation::Directory(
            self.data_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        )
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            view: Some(s.view.clone()),
            theme: Some(s.theme.clone()),
            timezone: Some(s.timezone.clone()),
            data_dir: s.data_dir.clone(),
            base_url: s.base_url.clone(),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
