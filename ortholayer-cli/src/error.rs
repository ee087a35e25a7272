//! CLI error handling with user-friendly messages.
//!
//! Every command returns [`CliError`]; `main` prints it and exits with 1.

use ortholayer::config::ConfigFileError;
use ortholayer::fuse::MountError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(io::Error),
    /// Configuration file could not be read or written
    ConfigFile(ConfigFileError),
    /// A required setting is missing or invalid
    Config(String),
    /// Backing directory does not exist
    MissingRoot(PathBuf),
    /// Background threads could not be started
    Startup(String),
    /// Mounting or serving failed
    Mount(MountError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Mount(MountError::Io(_)) => {
                eprintln!();
                eprintln!("Common issues:");
                eprintln!("  1. FUSE not installed: sudo apt install fuse3 (Linux)");
                eprintln!("  2. allow_other requires user_allow_other in /etc/fuse.conf");
                eprintln!(
                    "  3. Mountpoint in use: Try unmounting with: fusermount -u <mountpoint>"
                );
            }
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Pass the value on the command line or set it in the config file.");
                eprintln!("Run 'ortholayer init' to create a config file with defaults.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::MissingRoot(path) => {
                write!(f, "Backing directory does not exist: {}", path.display())
            }
            CliError::Startup(msg) => write!(f, "Failed to start: {}", msg),
            CliError::Mount(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::ConfigFile(e) => Some(e),
            CliError::Mount(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<MountError> for CliError {
    fn from(e: MountError) -> Self {
        CliError::Mount(e)
    }
}
