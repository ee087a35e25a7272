//! Check command - show how the filesystem would treat a path.

use ortholayer::cache::TileKey;
use ortholayer::config::ConfigFile;
use ortholayer::fuse::{classify, PathKind};
use std::path::Path;

/// One-line description of the classification of `path`.
pub fn describe(path: &Path, config: &ConfigFile) -> String {
    match classify(path) {
        PathKind::Virtual(name) => {
            let mut key = TileKey::from(&name);
            if let Some(map_type) = &config.tiles.maptype_override {
                key = key.with_map_type(map_type.clone());
            }
            format!(
                "virtual texture: row {}, column {}, map type '{}', zoom {} (tile {})",
                name.row, name.col, name.map_type, name.zoom, key
            )
        }
        PathKind::Dsf => "DSF region descriptor (passthrough)".to_string(),
        PathKind::Terrain(ter) => format!(
            "terrain definition, map type '{}', zoom {} (passthrough)",
            ter.map_type, ter.zoom
        ),
        PathKind::Passthrough => "passthrough".to_string(),
    }
}

/// Run the check command.
pub fn run(path: &Path, config: &ConfigFile) {
    println!("{}: {}", path.display(), describe(path, config));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_virtual() {
        let text = describe(
            Path::new("/textures/24832_12416_BI16.dds"),
            &ConfigFile::default(),
        );
        assert_eq!(
            text,
            "virtual texture: row 24832, column 12416, map type 'BI', zoom 16 (tile 24832_12416_BI16)"
        );
    }

    #[test]
    fn test_describe_applies_override() {
        let mut config = ConfigFile::default();
        config.tiles.maptype_override = Some("GO2".to_string());
        let text = describe(Path::new("1_2_BI16.dds"), &config);
        assert!(text.ends_with("(tile 1_2_GO216)"), "{}", text);
    }

    #[test]
    fn test_describe_passthrough_kinds() {
        let config = ConfigFile::default();
        assert_eq!(
            describe(Path::new("/+37-123.dsf"), &config),
            "DSF region descriptor (passthrough)"
        );
        assert_eq!(
            describe(Path::new("/1_2_ZL16.dds"), &config),
            "passthrough"
        );
        assert!(describe(Path::new("/1_2_BI16.ter"), &config).starts_with("terrain"));
    }
}
