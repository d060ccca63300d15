//! CLI runner for common setup.
//!
//! Loads the configuration file and initializes logging so command handlers
//! start from the same state.

use crate::error::CliError;
use std::path::{Path, PathBuf};
use tilecascade::config::ConfigFile;
use tilecascade::logging::{init_logging, LoggingGuard};
use tracing::info;

/// Runner that manages CLI lifecycle.
pub struct CliRunner {
    /// Keeps logging active while the runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Load config and initialize logging.
    ///
    /// `log_dir` overrides the `[logging] directory` setting.
    pub fn new(config_path: Option<&Path>, log_dir: Option<PathBuf>) -> Result<Self, CliError> {
        let config = load_config(config_path)?;

        let log_dir = log_dir.unwrap_or_else(|| config.logging.directory.clone());
        let logging_guard = init_logging(&log_dir, &config.logging.file)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("TileCascade v{}", tilecascade::VERSION);
        info!(
            command,
            max_cache_tiles = self.config.cache.max_tiles,
            max_tries = self.config.fetch.max_tries,
            "TileCascade CLI starting"
        );
    }
}

/// Loads the configuration file, or defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::load_from(path)?),
        None => Ok(ConfigFile::default()),
    }
}
