//! Serialization of `ConfigFile` to the commented INI written to disk.

use std::path::Path;

use super::settings::ConfigFile;
use super::size::format_size;

/// Render `config` as a commented INI document.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let root = config
        .paths
        .root
        .as_deref()
        .map(path_to_string)
        .unwrap_or_default();
    let mountpoint = config
        .paths
        .mountpoint
        .as_deref()
        .map(path_to_string)
        .unwrap_or_default();
    let maptype_override = config.tiles.maptype_override.as_deref().unwrap_or("");

    format!(
        r#"[paths]
; Directory holding the scenery tree to expose (textures, terrain, DSFs)
root = {}
; Where the filesystem is mounted, usually inside X-Plane's Custom Scenery
mountpoint = {}
; Scratch directory for tile providers
cache_dir = {}

[tiles]
; Serve every texture from this imagery source regardless of its filename
; (e.g. BI, GO2, EOX). Leave empty to use the map type in the name.
maptype_override = {}

[cache]
; Never evict while fewer than this many tiles are cached
watermark = {}
; Resident memory ceiling (default: 2GB). Supports KB, MB, GB suffixes
memory_limit = {}
; Maximum tiles evicted per pass
evict_batch = {}
; Seconds between reclamation cycles
reclaim_interval = {}

[fuse]
; Worker threads for reads: 0 = number of CPUs, 1 = single-threaded
threads = {}
; Let other users (X-Plane) access the mount. Needs user_allow_other in
; /etc/fuse.conf when not running as root.
allow_other = {}
; Owner reported for generated textures
uid = {}
gid = {}

[logging]
file = {}
; Verbose logging (same as --debug or ORTHOLAYER_DEBUG=1)
debug = {}
"#,
        root,
        mountpoint,
        path_to_string(&config.paths.cache_dir),
        maptype_override,
        config.cache.watermark,
        format_size(config.cache.memory_limit),
        config.cache.evict_batch,
        config.cache.reclaim_interval,
        config.fuse.threads,
        config.fuse.allow_other,
        config.fuse.uid,
        config.fuse.gid,
        path_to_string(&config.logging.file),
        config.logging.debug,
    )
}

/// Display a path, abbreviating the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
