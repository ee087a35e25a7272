//! Init command - write a config file with default settings.

use crate::error::CliError;
use ortholayer::config::ConfigFile;
use std::path::Path;

/// Write defaults to `path`. An existing file is kept unless `force`.
///
/// Returns whether a file was written.
pub fn write_defaults(path: &Path, force: bool) -> Result<bool, CliError> {
    if force {
        ConfigFile::default().save_to(path)?;
        return Ok(true);
    }
    Ok(ConfigFile::ensure_exists_at(path)?)
}

/// Run the init command.
pub fn run(path: &Path, force: bool) -> Result<(), CliError> {
    if write_defaults(path, force)? {
        println!("Wrote default configuration to {}", path.display());
        println!();
        println!("Set [paths] root and mountpoint, then run 'ortholayer mount'.");
    } else {
        println!("Configuration already exists at {}", path.display());
        println!("Use --force to overwrite it with defaults.");
    }
    Ok(())
}
