//! Logging setup for feedmerge.
//!
//! Events go to stdout and, unless `logging.file` is empty, are appended to
//! a log file. `RUST_LOG` takes precedence over the configured level.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Dependencies that are chatty at `info` and below.
const QUIET_TARGETS: [&str; 4] = ["sqlx=warn", "hyper=warn", "reqwest=warn", "rustls=warn"];

/// Parse log level string to tracing Level.
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Filter for the configured level, unless `RUST_LOG` is set.
fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    QUIET_TARGETS
        .iter()
        .filter_map(|directive| directive.parse::<Directive>().ok())
        .fold(
            EnvFilter::default().add_directive(parse_level(level).into()),
            EnvFilter::add_directive,
        )
}

/// Open the log file for appending, creating its directory.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(File::options().create(true).append(true).open(path)?)
}

/// Initialize logging from configuration.
///
/// Fails if the log file cannot be opened; callers fall back to
/// [`init_console_only`].
pub fn init(config: &LoggingConfig) -> Result<()> {
    if config.file.trim().is_empty() {
        init_console_only(&config.level);
        return Ok(());
    }

    let log_file = open_log_file(Path::new(&config.file))?;
    let writer = std::io::stdout.and(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .with(build_filter(&config.level))
        .init();

    Ok(())
}

/// Initialize console-only logging.
pub fn init_console_only(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true),
        )
        .with(build_filter(level))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_known() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("Info"), Level::INFO);
        assert_eq!(parse_level("error"), Level::ERROR);
    }

    #[test]
    fn test_parse_level_warn_aliases() {
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("WARNING"), Level::WARN);
    }

    #[test]
    fn test_parse_level_default() {
        assert_eq!(parse_level("verbose"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn test_quiet_targets_parse() {
        for directive in QUIET_TARGETS {
            assert!(
                directive.parse::<Directive>().is_ok(),
                "{directive}"
            );
        }
    }

    #[test]
    fn test_open_log_file_creates_directory_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("feedmerge.log");

        std::io::Write::write_all(&mut open_log_file(&path).unwrap(), b"first\n").unwrap();
        std::io::Write::write_all(&mut open_log_file(&path).unwrap(), b"second\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
