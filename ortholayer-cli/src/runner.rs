//! CLI runner for common setup.
//!
//! Loads the configuration and installs logging for commands that serve.

use crate::error::CliError;
use ortholayer::config::{config_file_path, ConfigFile};
use ortholayer::logging::{init_logging, LoggingGuard};
use std::path::{Path, PathBuf};
use tracing::info;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Keeps the log file writer alive while the runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
    config_path: PathBuf,
}

impl CliRunner {
    /// Load the config (defaults if absent) and start logging.
    ///
    /// Debug logging is on when `debug` is set or the config asks for it.
    pub fn new(config_path: Option<&Path>, debug: bool) -> Result<Self, CliError> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        let config = load_config(&config_path)?;

        let debug = debug || config.logging.debug;
        let logging_guard =
            init_logging(&config.logging.file, debug).map_err(CliError::LoggingInit)?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
            config_path,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("OrthoLayer v{}", ortholayer::VERSION);
        info!(
            "OrthoLayer CLI: {} command (config: {})",
            command,
            self.config_path.display()
        );
    }
}

/// Load the config at `path`. A missing file yields defaults.
pub fn load_config(path: &Path) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load_from(path)?)
}
