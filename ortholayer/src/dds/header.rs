//! DDS header construction.

use crate::dds::types::*;

impl DdsHeader {
    /// Create a header for a block-compressed surface.
    ///
    /// # Arguments
    ///
    /// * `width` - Texture width in pixels
    /// * `height` - Texture height in pixels
    /// * `mipmap_count` - Number of mipmap levels (1 = no mipmaps)
    /// * `format` - Compression format (BC1 or BC3)
    pub fn new(width: u32, height: u32, mipmap_count: u32, format: DdsFormat) -> Self {
        let blocks_wide = width.div_ceil(4).max(1);
        let blocks_high = height.div_ceil(4).max(1);
        let pitch_or_linear_size = blocks_wide * blocks_high * format.block_size() as u32;

        let mut flags = DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT | DDSD_LINEARSIZE;
        let mut caps = DDSCAPS_TEXTURE;
        if mipmap_count > 1 {
            flags |= DDSD_MIPMAPCOUNT;
            caps |= DDSCAPS_COMPLEX | DDSCAPS_MIPMAP;
        }

        DdsHeader {
            magic: *b"DDS ",
            size: 124,
            flags,
            height,
            width,
            pitch_or_linear_size,
            depth: 0,
            mipmap_count,
            reserved1: [0; 11],
            pixel_format: DdsPixelFormat {
                size: 32,
                flags: DDPF_FOURCC,
                fourcc: format.fourcc(),
                rgb_bit_count: 0,
                r_bit_mask: 0,
                g_bit_mask: 0,
                b_bit_mask: 0,
                a_bit_mask: 0,
            },
            caps,
            caps2: 0,
            caps3: 0,
            caps4: 0,
            reserved2: 0,
        }
    }

    /// Serialize to the 128 on-disk bytes, little endian.
    pub fn to_bytes(&self) -> [u8; DDS_HEADER_LEN as usize] {
        let mut bytes = [0u8; DDS_HEADER_LEN as usize];
        let mut cursor = 0;
        let mut put = |chunk: &[u8]| {
            bytes[cursor..cursor + chunk.len()].copy_from_slice(chunk);
            cursor += chunk.len();
        };

        put(&self.magic);
        for value in [
            self.size,
            self.flags,
            self.height,
            self.width,
            self.pitch_or_linear_size,
            self.depth,
            self.mipmap_count,
        ] {
            put(&value.to_le_bytes());
        }
        for value in self.reserved1 {
            put(&value.to_le_bytes());
        }

        let pf = &self.pixel_format;
        put(&pf.size.to_le_bytes());
        put(&pf.flags.to_le_bytes());
        put(&pf.fourcc);
        for value in [
            pf.rgb_bit_count,
            pf.r_bit_mask,
            pf.g_bit_mask,
            pf.b_bit_mask,
            pf.a_bit_mask,
        ] {
            put(&value.to_le_bytes());
        }

        for value in [self.caps, self.caps2, self.caps3, self.caps4, self.reserved2] {
            put(&value.to_le_bytes());
        }

        bytes
    }
}
