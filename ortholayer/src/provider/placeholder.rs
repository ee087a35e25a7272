//! Built-in provider serving solid-colour textures.
//!
//! Every tile is a 4096×4096 DXT5 surface with a full mip chain, filled
//! with one colour. Bytes are computed per request, so a 22 MB texture
//! costs one header and one block of memory. Useful for checking that a
//! scenery package mounts and loads before real imagery is wired in.

use crate::cache::TileKey;
use crate::dds::{solid_block, DdsLayout, DDS_HEADER_LEN};
use crate::provider::tile::{clamp_range, ProviderError, TileProvider, TileProviderFactory};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Default fill colour (magenta, easy to spot in the simulator).
pub const PLACEHOLDER_RGBA: [u8; 4] = [255, 0, 255, 255];

/// Creates [`PlaceholderTile`]s.
#[derive(Debug, Clone)]
pub struct PlaceholderTileFactory {
    rgba: [u8; 4],
}

impl PlaceholderTileFactory {
    pub fn new() -> Self {
        Self {
            rgba: PLACEHOLDER_RGBA,
        }
    }

    /// Use a different fill colour.
    pub fn with_color(mut self, rgba: [u8; 4]) -> Self {
        self.rgba = rgba;
        self
    }
}

impl Default for PlaceholderTileFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl TileProviderFactory for PlaceholderTileFactory {
    fn create(
        &self,
        _key: &TileKey,
        cache_dir: &Path,
    ) -> Result<Arc<dyn TileProvider>, ProviderError> {
        fs::create_dir_all(cache_dir)?;
        Ok(Arc::new(PlaceholderTile::new(self.rgba)))
    }

    fn name(&self) -> &str {
        "placeholder"
    }
}

/// Header bytes and fill block, shared by every placeholder of one colour.
struct Surface {
    header: [u8; DDS_HEADER_LEN as usize],
    block: Vec<u8>,
    size: u64,
}

fn default_layout() -> &'static DdsLayout {
    static LAYOUT: OnceLock<DdsLayout> = OnceLock::new();
    LAYOUT.get_or_init(DdsLayout::xplane_default)
}

/// A solid-colour X-Plane texture.
pub struct PlaceholderTile {
    surface: Surface,
    closed: AtomicBool,
}

impl PlaceholderTile {
    pub fn new(rgba: [u8; 4]) -> Self {
        let layout = default_layout();
        Self {
            surface: Surface {
                header: layout.header().to_bytes(),
                block: solid_block(layout.format(), rgba),
                size: layout.total_size(),
            },
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl TileProvider for PlaceholderTile {
    fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>, ProviderError> {
        if self.is_closed() {
            return Err(ProviderError::Closed);
        }
        let Some(end) = clamp_range(offset, len, self.surface.size) else {
            return Ok(Vec::new());
        };

        let mut out = Vec::with_capacity((end - offset) as usize);
        let mut pos = offset;

        if pos < DDS_HEADER_LEN {
            let header_end = end.min(DDS_HEADER_LEN);
            out.extend_from_slice(&self.surface.header[pos as usize..header_end as usize]);
            pos = header_end;
        }

        // Every mip level starts on a block boundary, so the data region is
        // the fill block repeated from the end of the header onward.
        let block = &self.surface.block;
        let block_len = block.len() as u64;
        while pos < end {
            let within = ((pos - DDS_HEADER_LEN) % block_len) as usize;
            let take = (block.len() - within).min((end - pos) as usize);
            out.extend_from_slice(&block[within..within + take]);
            pos += take as u64;
        }

        Ok(out)
    }

    fn size(&self) -> u64 {
        self.surface.size
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
