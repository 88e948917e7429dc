//! Logging system configuration and initialization.
//!
//! Console output plus an optional non-blocking log file that is
//! rotated (renamed with a timestamp) on startup. Dependency noise is
//! filtered out unless trace level is requested, and `RUST_LOG`
//! overrides everything.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::Utc;
use lazy_static::lazy_static;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

pub use crate::infrastructure::config::LoggingConfig;

const LOG_FILE_NAME: &str = "catalog-crawler.log";

// Global guard store keeping the non-blocking writers alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

/// Default log directory, next to the executable.
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    exe_dir.join("logs")
}

/// Initialize the logging system with default configuration.
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Rotate an existing log file by renaming it with its modification timestamp.
fn rotate_existing_log_file(log_dir: &Path, log_file_name: &str) -> Result<()> {
    let log_file_path = log_dir.join(log_file_name);
    if !log_file_path.exists() {
        return Ok(());
    }

    let metadata = std::fs::metadata(&log_file_path)
        .map_err(|e| anyhow!("Failed to get log file metadata: {}", e))?;
    let file_time = metadata
        .created()
        .or_else(|_| metadata.modified())
        .unwrap_or_else(|_| std::time::SystemTime::now());

    let datetime: chrono::DateTime<Utc> = file_time.into();
    let file_stem = log_file_name.trim_end_matches(".log");
    let timestamped_name = format!("{}.{}.log", file_stem, datetime.format("%Y%m%dT%H%M%S"));
    let timestamped_path = log_dir.join(&timestamped_name);

    std::fs::rename(&log_file_path, &timestamped_path).map_err(|e| {
        anyhow!(
            "Failed to rotate log file {} to {}: {}",
            log_file_path.display(),
            timestamped_path.display(),
            e
        )
    })?;
    info!("Rotated existing log file to: {}", timestamped_name);
    Ok(())
}

/// Initialize logging with custom configuration.
///
/// Unless trace level is requested, verbose dependency targets
/// (reqwest/hyper internals, tokio scheduling) are suppressed. The
/// `RUST_LOG` environment variable overrides the configured filter:
/// ```bash
/// RUST_LOG="debug,reqwest=debug,hyper=debug" cargo run
/// ```
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(&config.level);
        if !config.level.to_lowercase().contains("trace") {
            filter = filter
                .add_directive("reqwest=info".parse().expect("static directive"))
                .add_directive("hyper=warn".parse().expect("static directive"))
                .add_directive("h2=warn".parse().expect("static directive"))
                .add_directive("tokio=info".parse().expect("static directive"))
                .add_directive("html5ever=warn".parse().expect("static directive"));
        }
        filter
    });

    let registry = Registry::default().with(env_filter);

    if config.file_output {
        let log_dir = config.log_dir.clone().unwrap_or_else(get_log_directory);
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;
        rotate_existing_log_file(&log_dir, LOG_FILE_NAME)?;

        let file_appender = rolling::never(&log_dir, LOG_FILE_NAME);
        let (file_writer, file_guard) = non_blocking(file_appender);
        // Keep the guard alive for the process lifetime
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard store poisoned"))?
            .push(file_guard);

        let file_layer = fmt::Layer::new()
            .with_writer(file_writer)
            .with_target(false)
            .with_ansi(false);
        let console_layer = fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_target(false);
        registry.with(file_layer).with(console_layer).init();
    } else {
        let console_layer = fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_target(false);
        registry.with(console_layer).init();
    }

    info!("Logging initialized at level '{}'", config.level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_renames_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        std::fs::write(&path, "old logs").unwrap();

        rotate_existing_log_file(dir.path(), LOG_FILE_NAME).unwrap();

        assert!(!path.exists());
        let rotated: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.starts_with("catalog-crawler.") && name.ends_with(".log")
            })
            .collect();
        assert_eq!(rotated.len(), 1);
    }

    #[test]
    fn test_rotation_without_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert!(rotate_existing_log_file(dir.path(), LOG_FILE_NAME).is_ok());
    }
}
