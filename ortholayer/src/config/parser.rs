//! INI parsing: the single place where key names map to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_positive(section: &str, key: &str, value: &str) -> Result<usize, ConfigFileError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(section, key, value, "must be a positive integer")),
    }
}

/// Parse an `Ini` into a `ConfigFile`, overlaying defaults.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("paths")) {
        if let Some(v) = non_empty(section.get("root")) {
            config.paths.root = Some(expand_tilde(v));
        }
        if let Some(v) = non_empty(section.get("mountpoint")) {
            config.paths.mountpoint = Some(expand_tilde(v));
        }
        if let Some(v) = non_empty(section.get("cache_dir")) {
            config.paths.cache_dir = expand_tilde(v);
        }
    }

    if let Some(section) = ini.section(Some("tiles")) {
        if let Some(v) = non_empty(section.get("maptype_override")) {
            if v.contains('/') {
                return Err(invalid(
                    "tiles",
                    "maptype_override",
                    v,
                    "must not contain '/'",
                ));
            }
            config.tiles.maptype_override = Some(v.to_string());
        }
    }

    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("watermark") {
            config.cache.watermark = v
                .trim()
                .parse()
                .map_err(|_| invalid("cache", "watermark", v, "must be a non-negative integer"))?;
        }
        if let Some(v) = section.get("memory_limit") {
            config.cache.memory_limit = parse_size(v).map_err(|_| {
                invalid(
                    "cache",
                    "memory_limit",
                    v,
                    "expected format like '2GB', '500MB', or '1024KB'",
                )
            })?;
        }
        if let Some(v) = section.get("evict_batch") {
            config.cache.evict_batch = parse_positive("cache", "evict_batch", v)?;
        }
        if let Some(v) = section.get("reclaim_interval") {
            config.cache.reclaim_interval =
                parse_positive("cache", "reclaim_interval", v)? as u64;
        }
    }

    if let Some(section) = ini.section(Some("fuse")) {
        if let Some(v) = section.get("threads") {
            config.fuse.threads = v
                .trim()
                .parse()
                .map_err(|_| invalid("fuse", "threads", v, "must be a non-negative integer"))?;
        }
        if let Some(v) = section.get("allow_other") {
            config.fuse.allow_other = parse_bool(v);
        }
        if let Some(v) = section.get("uid") {
            config.fuse.uid = v
                .trim()
                .parse()
                .map_err(|_| invalid("fuse", "uid", v, "must be a numeric user id"))?;
        }
        if let Some(v) = section.get("gid") {
            config.fuse.gid = v
                .trim()
                .parse()
                .map_err(|_| invalid("fuse", "gid", v, "must be a numeric group id"))?;
        }
    }

    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = expand_tilde(v);
        }
        if let Some(v) = section.get("debug") {
            config.logging.debug = parse_bool(v);
        }
    }

    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts true/false, yes/no, 1/0, on/off (case-insensitive).
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand a leading `~/` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
