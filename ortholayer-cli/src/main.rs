//! OrthoLayer CLI - Command-line interface
//!
//! Mounts a scenery directory with on-demand DDS textures.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use commands::mount::MountArgs;
use error::CliError;
use ortholayer::config::config_file_path;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ortholayer")]
#[command(version = ortholayer::VERSION)]
#[command(about = "On-demand ortho textures for X-Plane", long_about = None)]
struct Cli {
    /// Config file (default: ~/.ortholayer/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount a backing directory, generating textures on demand
    Mount {
        /// Directory whose contents the mount exposes
        root: Option<PathBuf>,

        /// Where to mount
        mountpoint: Option<PathBuf>,

        /// Directory for tile provider scratch files
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Replace the map type of every requested texture (empty to disable)
        #[arg(long)]
        maptype_override: Option<String>,

        /// FUSE worker threads (0 = number of CPUs, 1 = single-threaded)
        #[arg(long)]
        threads: Option<usize>,

        /// Enable debug logging
        #[arg(long, env = "ORTHOLAYER_DEBUG")]
        debug: bool,
    },

    /// Write a config file with default settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show how a path would be served
    Check {
        /// Path as seen through the mount, e.g. /textures/24832_12416_BI16.dds
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Mount {
            root,
            mountpoint,
            cache_dir,
            maptype_override,
            threads,
            debug,
        } => commands::mount::run(MountArgs {
            root,
            mountpoint,
            cache_dir,
            maptype_override,
            threads,
            config: cli.config,
            debug,
        }),
        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config_file_path);
            commands::init::run(&path, force)
        }
        Commands::Check { path } => {
            let config_path = cli.config.unwrap_or_else(config_file_path);
            let config = runner::load_config(&config_path)?;
            commands::check::run(&path, &config);
            Ok(())
        }
    }
}
