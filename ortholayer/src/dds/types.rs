//! DDS format types and error definitions.

use std::fmt;

/// DDS block compression format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DdsFormat {
    /// BC1/DXT1 compression (8 bytes per 4×4 block)
    BC1,
    /// BC3/DXT5 compression (16 bytes per 4×4 block)
    BC3,
}

impl DdsFormat {
    /// Bytes occupied by one compressed 4×4 block.
    pub fn block_size(self) -> u64 {
        match self {
            DdsFormat::BC1 => 8,
            DdsFormat::BC3 => 16,
        }
    }

    /// FourCC code written into the pixel format header.
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            DdsFormat::BC1 => *b"DXT1",
            DdsFormat::BC3 => *b"DXT5",
        }
    }
}

impl fmt::Display for DdsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DdsFormat::BC1 => write!(f, "BC1"),
            DdsFormat::BC3 => write!(f, "BC3"),
        }
    }
}

/// Errors describing an impossible texture layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdsError {
    /// Dimensions are zero or not a power of two
    InvalidDimensions(u32, u32),
    /// More mip levels were requested than the surface can hold
    InvalidMipmapChain(String),
}

impl fmt::Display for DdsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DdsError::InvalidDimensions(w, h) => {
                write!(f, "Invalid dimensions: {}×{}", w, h)
            }
            DdsError::InvalidMipmapChain(msg) => write!(f, "Invalid mipmap chain: {}", msg),
        }
    }
}

impl std::error::Error for DdsError {}

/// DDS file header (magic + 124 byte structure).
///
/// Layout follows the Microsoft DDS_HEADER definition.
#[repr(C)]
#[derive(Debug, Clone)]
pub struct DdsHeader {
    /// Magic number: "DDS "
    pub magic: [u8; 4],
    /// Size of structure (124 bytes)
    pub size: u32,
    /// Flags indicating which fields are valid
    pub flags: u32,
    /// Surface height in pixels
    pub height: u32,
    /// Surface width in pixels
    pub width: u32,
    /// Linear size of the top-level surface
    pub pitch_or_linear_size: u32,
    /// Depth for volume textures
    pub depth: u32,
    /// Number of mipmap levels
    pub mipmap_count: u32,
    pub reserved1: [u32; 11],
    /// Pixel format structure (32 bytes)
    pub pixel_format: DdsPixelFormat,
    pub caps: u32,
    pub caps2: u32,
    pub caps3: u32,
    pub caps4: u32,
    pub reserved2: u32,
}

/// DDS pixel format structure (32 bytes).
#[repr(C)]
#[derive(Debug, Clone)]
pub struct DdsPixelFormat {
    pub size: u32,
    pub flags: u32,
    /// FourCC code ("DXT1" or "DXT5")
    pub fourcc: [u8; 4],
    pub rgb_bit_count: u32,
    pub r_bit_mask: u32,
    pub g_bit_mask: u32,
    pub b_bit_mask: u32,
    pub a_bit_mask: u32,
}

/// Bytes taken by the magic number plus the header structure.
pub const DDS_HEADER_LEN: u64 = 128;

// DDS header flags (DDSD_*)
pub const DDSD_CAPS: u32 = 0x1;
pub const DDSD_HEIGHT: u32 = 0x2;
pub const DDSD_WIDTH: u32 = 0x4;
pub const DDSD_PIXELFORMAT: u32 = 0x1000;
pub const DDSD_MIPMAPCOUNT: u32 = 0x20000;
pub const DDSD_LINEARSIZE: u32 = 0x80000;

// DDS pixel format flags (DDPF_*)
pub const DDPF_FOURCC: u32 = 0x4;

// DDS caps flags (DDSCAPS_*)
pub const DDSCAPS_COMPLEX: u32 = 0x8;
pub const DDSCAPS_MIPMAP: u32 = 0x400000;
pub const DDSCAPS_TEXTURE: u32 = 0x1000;
