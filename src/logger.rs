//! Logging setup built on `fern`
//!
//! Every module logs through the `log` macros; this module decides where
//! those lines go. Lines at or above `logging.console_level` go to stderr.
//! When `logging.file` is enabled, everything at `logging.level` is also
//! appended to a log file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::LevelFilter;

use crate::config::LoggingConfig;

/// Default log file location under the user data directory
pub fn get_log_file_path() -> Result<PathBuf> {
    dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
        .map(|dir| dir.join("yougile-sync").join("yougile-sync.log"))
}

/// Log file to use for the given settings, if file logging is enabled
pub fn resolve_log_path(config: &LoggingConfig) -> Result<Option<PathBuf>> {
    if !config.file {
        return Ok(None);
    }
    match &config.path {
        Some(path) => Ok(Some(path.clone())),
        None => get_log_file_path().map(Some),
    }
}

/// Build the dispatch without installing it.
pub fn dispatch(config: &LoggingConfig) -> Result<fern::Dispatch> {
    let level: LevelFilter = config
        .level
        .parse()
        .with_context(|| format!("Invalid log level '{}'", config.level))?;
    let console_level: LevelFilter = config
        .console_level
        .parse()
        .with_context(|| format!("Invalid console log level '{}'", config.console_level))?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {:<5} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        // Query logging from the database layer is noise at info level
        .level_for("sqlx", LevelFilter::Warn)
        .level_for("sea_orm", LevelFilter::Warn)
        .chain(fern::Dispatch::new().level(console_level).chain(std::io::stderr()));

    if let Some(path) = resolve_log_path(config)? {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
        let file = fern::log_file(&path).with_context(|| format!("Failed to open log file: {}", path.display()))?;
        dispatch = dispatch.chain(file);
    }

    Ok(dispatch)
}

/// Install the global logger. Can only succeed once per process.
pub fn init(config: &LoggingConfig) -> Result<()> {
    dispatch(config)?.apply().context("Logger already initialized")?;
    Ok(())
}
