use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dash_core::settings::APP_DIR_NAME;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name of the default log under `~/.billing-dash/logs/`.
pub const LOG_FILE_NAME: &str = "billing-dash.log";

// ── Directory bootstrap ────────────────────────────────────────────────────────

fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// Ensure `~/.billing-dash/` and `~/.billing-dash/logs/` exist.
pub fn ensure_directories() -> anyhow::Result<()> {
    let dir = app_dir();
    std::fs::create_dir_all(dir.join("logs"))?;
    Ok(())
}

/// Log file used when `--log-file` is not given.
pub fn default_log_path() -> PathBuf {
    app_dir().join("logs").join(LOG_FILE_NAME)
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

/// Pick the log target for the run.
///
/// An explicit `--log-file` always wins. Otherwise the TUI owns the terminal,
/// so logs go to the default file; JSON output keeps stdout clean and logs
/// to stderr.
pub fn log_target(log_file: Option<&PathBuf>, tui: bool) -> LogTarget {
    match log_file {
        Some(path) => LogTarget::File(path.clone()),
        None if tui => LogTarget::File(default_log_path()),
        None => LogTarget::Stderr,
    }
}

/// Map the CLI level names onto an [`EnvFilter`] directive.
///
/// Unrecognised values are passed through, so `RUST_LOG`-style directives
/// such as `dash_runtime=debug` also work.
pub fn filter_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Falls back to `"info"` when the level cannot be parsed.
pub fn setup_logging(log_level: &str, target: &LogTarget) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(filter_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, stderr_layer) = match target {
        LogTarget::File(path) => {
            let file = open_log_file(path)?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), None)
        }
        LogTarget::Stderr => {
            let layer = fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            (None, Some(layer))
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    Ok(())
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_directories() {
        let tmp = TempDir::new().expect("tempdir");

        // Override HOME so that dirs::home_dir() resolves to our temp dir.
        let original_home = std::env::var_os("HOME");
        std::env::set_var("HOME", tmp.path());

        let result = ensure_directories();
        let log_path = default_log_path();

        match original_home {
            Some(v) => std::env::set_var("HOME", v),
            None => std::env::remove_var("HOME"),
        }

        result.expect("ensure_directories should succeed");

        let dir = tmp.path().join(APP_DIR_NAME);
        assert!(dir.is_dir(), "app dir must exist");
        assert!(dir.join("logs").is_dir(), "logs subdir must exist");
        assert_eq!(log_path, dir.join("logs").join(LOG_FILE_NAME));
    }

    #[test]
    fn test_log_target_routing() {
        let explicit = PathBuf::from("/tmp/dash.log");
        assert_eq!(
            log_target(Some(&explicit), false),
            LogTarget::File(explicit.clone())
        );
        assert_eq!(log_target(Some(&explicit), true), LogTarget::File(explicit));
        assert_eq!(log_target(None, false), LogTarget::Stderr);
        assert!(matches!(log_target(None, true), LogTarget::File(_)));
    }

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive("DEBUG"), "debug");
        assert_eq!(filter_directive("warning"), "warn");
        assert_eq!(filter_directive("CRITICAL"), "error");
        assert_eq!(filter_directive("dash_runtime=trace"), "dash_runtime=trace");
    }

    #[test]
    fn test_open_log_file_creates_parents() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("nested").join("run.log");
        open_log_file(&path).expect("open");
        assert!(path.exists());
    }
}
