//! User configuration (`~/.ortholayer/config.ini`).
//!
//! ```
//! use ortholayer::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! assert_eq!(config.cache.watermark, 90);
//! let cache = config.tile_cache_config();
//! assert_eq!(cache.evict_batch, 20);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use parser::expand_tilde;
pub use settings::{
    CacheSettings, ConfigFile, FuseSettings, LoggingSettings, PathSettings, TileSettings,
};
pub use size::{format_size, parse_size, Size, SizeParseError};
