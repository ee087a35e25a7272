//! DDS (DirectDraw Surface) layout for X-Plane ortho textures.
//!
//! Only the parts needed to serve a texture by byte range live here: header
//! serialization, mip-level offsets, and solid-colour blocks for
//! placeholders. Real imagery encoding belongs to the tile content provider.
//!
//! ## BC1 (DXT1)
//!
//! 8 bytes per 4×4 block: two RGB565 endpoints plus 2-bit indices.
//!
//! ## BC3 (DXT5)
//!
//! 16 bytes per 4×4 block: an 8-byte alpha block followed by a BC1 colour
//! block. X-Plane ortho textures are BC3.

mod block;
mod header;
mod layout;
mod types;

pub use block::{rgb888_to_rgb565, solid_block};
pub use layout::{DdsLayout, MipLevel};
pub use types::{DdsError, DdsFormat, DdsHeader, DdsPixelFormat, DDS_HEADER_LEN};
