//! Solid-colour compressed blocks.
//!
//! A surface filled with one colour compresses to the same block repeated,
//! so a placeholder texture of any size is fully described by one block.

use crate::dds::types::DdsFormat;

/// Convert 8-bit RGB to the 5:6:5 packing used by BC colour endpoints.
pub fn rgb888_to_rgb565(r: u8, g: u8, b: u8) -> u16 {
    let r5 = (r >> 3) as u16;
    let g6 = (g >> 2) as u16;
    let b5 = (b >> 3) as u16;
    (r5 << 11) | (g6 << 5) | b5
}

/// Encode one 4×4 block where every pixel is `rgba`.
///
/// Both colour endpoints are identical and every index selects endpoint 0.
/// For BC3 the alpha half uses the same trick.
pub fn solid_block(format: DdsFormat, rgba: [u8; 4]) -> Vec<u8> {
    let color = rgb888_to_rgb565(rgba[0], rgba[1], rgba[2]).to_le_bytes();
    let color_block = [color[0], color[1], color[0], color[1], 0, 0, 0, 0];

    match format {
        DdsFormat::BC1 => color_block.to_vec(),
        DdsFormat::BC3 => {
            let mut block = vec![rgba[3], rgba[3], 0, 0, 0, 0, 0, 0];
            block.extend_from_slice(&color_block);
            block
        }
    }
}
