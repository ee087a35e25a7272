//! Byte layout of a mip-mapped DDS surface.
//!
//! X-Plane reads ortho textures piecemeal: the 128-byte header first, then
//! whichever mip level it needs for the current view distance. The layout
//! lets a provider map any byte offset to a mip level without building the
//! whole file.

use crate::dds::types::{DdsError, DdsFormat, DdsHeader, DDS_HEADER_LEN};

/// Offset and length of one mip level within the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipLevel {
    /// Level index (0 = full resolution)
    pub level: u32,
    /// Level width in pixels
    pub width: u32,
    /// Level height in pixels
    pub height: u32,
    /// Absolute byte offset of the first block
    pub offset: u64,
    /// Length of the level in bytes
    pub len: u64,
}

impl MipLevel {
    /// Whether the absolute `offset` falls inside this level.
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.offset && offset < self.offset + self.len
    }
}

/// Complete layout of a block-compressed DDS file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsLayout {
    width: u32,
    height: u32,
    format: DdsFormat,
    levels: Vec<MipLevel>,
}

impl DdsLayout {
    /// Build the layout for a power-of-two surface.
    ///
    /// # Errors
    ///
    /// Returns [`DdsError`] if the dimensions are not powers of two, or if
    /// `mipmap_count` would shrink the surface below one pixel.
    pub fn new(
        width: u32,
        height: u32,
        format: DdsFormat,
        mipmap_count: u32,
    ) -> Result<Self, DdsError> {
        if width == 0 || height == 0 || !width.is_power_of_two() || !height.is_power_of_two() {
            return Err(DdsError::InvalidDimensions(width, height));
        }
        let max_levels = 32 - width.min(height).leading_zeros();
        if mipmap_count == 0 || mipmap_count > max_levels {
            return Err(DdsError::InvalidMipmapChain(format!(
                "{} levels requested, {}×{} allows 1..={}",
                mipmap_count, width, height, max_levels
            )));
        }

        let mut levels = Vec::with_capacity(mipmap_count as usize);
        let mut offset = DDS_HEADER_LEN;
        for level in 0..mipmap_count {
            let w = (width >> level).max(1);
            let h = (height >> level).max(1);
            let blocks = u64::from(w.div_ceil(4)) * u64::from(h.div_ceil(4));
            let len = blocks * format.block_size();
            levels.push(MipLevel {
                level,
                width: w,
                height: h,
                offset,
                len,
            });
            offset += len;
        }

        Ok(Self {
            width,
            height,
            format,
            levels,
        })
    }

    /// The layout X-Plane ortho textures use: 4096×4096 DXT5, mips down to 4×4.
    pub fn xplane_default() -> Self {
        Self::new(4096, 4096, DdsFormat::BC3, 11).expect("4096² DXT5 with 11 levels is valid")
    }

    /// Total file size including the header.
    pub fn total_size(&self) -> u64 {
        self.levels
            .last()
            .map(|level| level.offset + level.len)
            .unwrap_or(DDS_HEADER_LEN)
    }

    /// Mip levels in file order.
    pub fn levels(&self) -> &[MipLevel] {
        &self.levels
    }

    /// Level containing the absolute `offset`, if any.
    pub fn level_at(&self, offset: u64) -> Option<&MipLevel> {
        self.levels.iter().find(|level| level.contains(offset))
    }

    pub fn format(&self) -> DdsFormat {
        self.format
    }

    /// Header describing this layout.
    pub fn header(&self) -> DdsHeader {
        DdsHeader::new(
            self.width,
            self.height,
            self.levels.len() as u32,
            self.format,
        )
    }
}
