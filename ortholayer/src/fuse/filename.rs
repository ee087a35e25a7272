//! Path classification for X-Plane ortho scenery.
//!
//! Decides, per request path, whether the name is a virtual DDS texture that
//! is generated on demand or a real file that passes through to the backing
//! directory. Texture names look like `24832_12416_BI16.dds`:
//! - Row: 24832
//! - Column: 12416
//! - Map type: "BI"
//! - Zoom level: 16
//!
//! DSF region descriptors (`+37-123.dsf`) and terrain definitions
//! (`24832_12416_BI16.ter`) are recognized too. They currently pass through
//! unchanged, but tooling probes for them so the recognizers stay.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Map-type prefix reserved for zoom-level marker files.
pub const ZOOM_MARKER: &str = "ZL";

/// Parsed DDS filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DdsFilename {
    /// Tile row
    pub row: u32,
    /// Tile column
    pub col: u32,
    /// Imagery source tag, e.g. "BI" or "GO2"
    pub map_type: String,
    /// Zoom level
    pub zoom: u8,
}

/// Parsed terrain definition filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainFilename {
    pub map_type: String,
    pub zoom: u32,
}

/// Why a name is not a virtual DDS texture.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Filename doesn't match the texture naming convention
    #[error("Filename doesn't match DDS pattern")]
    InvalidPattern,
    /// Map type begins with the zoom-marker token
    #[error("Map type '{0}' is reserved for zoom markers")]
    ReservedMapType(String),
    #[error("Invalid row coordinate: {0}")]
    InvalidRow(String),
    #[error("Invalid column coordinate: {0}")]
    InvalidColumn(String),
    #[error("Invalid zoom level: {0}")]
    InvalidZoom(String),
}

/// How the dispatch layer should treat a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKind {
    /// Generated texture served from the tile cache
    Virtual(DdsFilename),
    /// DSF region descriptor (served from disk)
    Dsf,
    /// Terrain definition (served from disk)
    Terrain(TerrainFilename),
    /// Anything else (served from disk)
    Passthrough,
}

impl PathKind {
    /// Texture identity if this is a virtual path.
    pub fn as_virtual(&self) -> Option<&DdsFilename> {
        match self {
            PathKind::Virtual(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, PathKind::Virtual(_))
    }
}

// `<row><sep><col><sep><maptype><zoom>.dds`
//
// The regex crate has no lookahead, so the zoom-marker exclusion is checked
// after matching. `[^\d/]*` keeps the map type inside the final component.
fn dds_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)[-_](\d+)[-_]([^\d/]*)(\d+)\.dds$").unwrap())
}

fn dsf_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[-+]\d+[-+]\d+\.dsf$").unwrap())
}

fn ter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+[-_]\d+[-_]([^\d/]*)(\d+)\.ter$").unwrap())
}

/// Final component of a `/`-separated request path.
fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Parse a DDS texture filename.
///
/// Accepts a bare filename or a path; only the final component is examined.
///
/// # Examples
///
/// ```
/// use ortholayer::fuse::parse_dds_filename;
///
/// let name = parse_dds_filename("/textures/24832_12416_BI16.dds").unwrap();
/// assert_eq!(name.row, 24832);
/// assert_eq!(name.col, 12416);
/// assert_eq!(name.map_type, "BI");
/// assert_eq!(name.zoom, 16);
/// ```
pub fn parse_dds_filename(path: &str) -> Result<DdsFilename, ParseError> {
    let captures = dds_pattern()
        .captures(file_name(path))
        .ok_or(ParseError::InvalidPattern)?;

    let map_type = &captures[3];
    if map_type.starts_with(ZOOM_MARKER) {
        return Err(ParseError::ReservedMapType(map_type.to_string()));
    }

    let row = captures[1]
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidRow(captures[1].to_string()))?;
    let col = captures[2]
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidColumn(captures[2].to_string()))?;
    let zoom = captures[4]
        .parse::<u8>()
        .map_err(|_| ParseError::InvalidZoom(captures[4].to_string()))?;

    Ok(DdsFilename {
        row,
        col,
        map_type: map_type.to_string(),
        zoom,
    })
}

/// Whether `path` names a DSF region descriptor.
pub fn is_dsf_filename(path: &str) -> bool {
    dsf_pattern().is_match(file_name(path))
}

/// Parse a terrain definition filename.
pub fn parse_ter_filename(path: &str) -> Option<TerrainFilename> {
    let captures = ter_pattern().captures(file_name(path))?;
    let zoom = captures[2].parse().ok()?;
    Some(TerrainFilename {
        map_type: captures[1].to_string(),
        zoom,
    })
}

/// Classify a request path.
///
/// Never fails: anything that is not a well-formed texture name is
/// passthrough.
pub fn classify(path: &Path) -> PathKind {
    let Some(path) = path.to_str() else {
        return PathKind::Passthrough;
    };

    if let Ok(name) = parse_dds_filename(path) {
        return PathKind::Virtual(name);
    }
    if is_dsf_filename(path) {
        return PathKind::Dsf;
    }
    if let Some(ter) = parse_ter_filename(path) {
        return PathKind::Terrain(ter);
    }
    PathKind::Passthrough
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_underscore_separators() {
        let name = parse_dds_filename("24832_12416_BI16.dds").unwrap();
        assert_eq!(name.row, 24832);
        assert_eq!(name.col, 12416);
        assert_eq!(name.map_type, "BI");
        assert_eq!(name.zoom, 16);
    }

    #[test]
    fn test_parse_dash_separators() {
        let name = parse_dds_filename("3232-2176-Null13.dds").unwrap();
        assert_eq!(name.row, 3232);
        assert_eq!(name.col, 2176);
        assert_eq!(name.map_type, "Null");
        assert_eq!(name.zoom, 13);
    }

    #[test]
    fn test_parse_mixed_separators() {
        let name = parse_dds_filename("100_200-GO216.dds").unwrap();
        assert_eq!(name.map_type, "GO");
        assert_eq!(name.zoom, 216);
    }

    #[test]
    fn test_parse_empty_map_type() {
        let name = parse_dds_filename("24832_12416_16.dds").unwrap();
        assert_eq!(name.map_type, "");
        assert_eq!(name.zoom, 16);
    }

    #[test]
    fn test_parse_with_path() {
        let name = parse_dds_filename("/terrain/textures/24832_12416_BI16.dds").unwrap();
        assert_eq!(name.row, 24832);
        assert_eq!(name.zoom, 16);
    }

    #[test]
    fn test_map_type_stays_in_file_name() {
        // The map type may not swallow a directory separator
        assert_eq!(
            parse_dds_filename("/12_34_a/b16.dds"),
            Err(ParseError::InvalidPattern)
        );
    }

    #[test]
    fn test_rejects_zoom_marker() {
        assert_eq!(
            parse_dds_filename("24832_12416_ZL16.dds"),
            Err(ParseError::ReservedMapType("ZL".to_string()))
        );
        assert!(matches!(
            parse_dds_filename("24832_12416_ZLX16.dds"),
            Err(ParseError::ReservedMapType(_))
        ));
    }

    #[test]
    fn test_zoom_marker_is_case_sensitive() {
        let name = parse_dds_filename("24832_12416_zl16.dds").unwrap();
        assert_eq!(name.map_type, "zl");
    }

    #[test]
    fn test_rejects_wrong_extension() {
        assert_eq!(
            parse_dds_filename("24832_12416_BI16.png"),
            Err(ParseError::InvalidPattern)
        );
        assert_eq!(
            parse_dds_filename("24832_12416_BI16.DDS"),
            Err(ParseError::InvalidPattern)
        );
        assert_eq!(
            parse_dds_filename("24832_12416_BI16.dds.bak"),
            Err(ParseError::InvalidPattern)
        );
    }

    #[test]
    fn test_rejects_signed_coordinates() {
        assert_eq!(
            parse_dds_filename("+37-123_BI16.dds"),
            Err(ParseError::InvalidPattern)
        );
    }

    #[test]
    fn test_rejects_missing_zoom() {
        assert_eq!(
            parse_dds_filename("24832_12416_BI.dds"),
            Err(ParseError::InvalidPattern)
        );
    }

    #[test]
    fn test_rejects_row_overflow() {
        assert!(matches!(
            parse_dds_filename("99999999999_12416_BI16.dds"),
            Err(ParseError::InvalidRow(_))
        ));
    }

    #[test]
    fn test_rejects_zoom_overflow() {
        assert!(matches!(
            parse_dds_filename("1_2_BI300.dds"),
            Err(ParseError::InvalidZoom(_))
        ));
    }

    #[test]
    fn test_dsf_recognizer() {
        assert!(is_dsf_filename("/Earth nav data/+30-120/+37-123.dsf"));
        assert!(is_dsf_filename("-01+002.dsf"));
        assert!(!is_dsf_filename("37-123.dsf"));
    }

    #[test]
    fn test_ter_recognizer() {
        let ter = parse_ter_filename("/terrain/24832_12416_BI16.ter").unwrap();
        assert_eq!(ter.map_type, "BI");
        assert_eq!(ter.zoom, 16);
        assert!(parse_ter_filename("/terrain/readme.txt").is_none());
    }

    #[test]
    fn test_classify() {
        assert!(classify(Path::new("/textures/24832_12416_BI16.dds")).is_virtual());
        assert_eq!(classify(Path::new("/+37-123.dsf")), PathKind::Dsf);
        assert!(matches!(
            classify(Path::new("/terrain/24832_12416_BI16.ter")),
            PathKind::Terrain(_)
        ));
        assert_eq!(classify(Path::new("/textures/water.png")), PathKind::Passthrough);
        assert_eq!(
            classify(Path::new("/textures/1_2_ZL16.dds")),
            PathKind::Passthrough
        );
    }

    #[test]
    fn test_classify_overflow_is_passthrough() {
        assert_eq!(
            classify(Path::new("/99999999999_1_BI16.dds")),
            PathKind::Passthrough
        );
    }

    #[test]
    fn test_as_virtual() {
        let kind = classify(Path::new("/24832_12416_BI16.dds"));
        assert_eq!(kind.as_virtual().map(|n| n.zoom), Some(16));
        assert!(PathKind::Dsf.as_virtual().is_none());
    }
}
