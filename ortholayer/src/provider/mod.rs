//! Tile content providers.
//!
//! The tile cache opens one [`TileProvider`] per tile through a
//! [`TileProviderFactory`]. [`PlaceholderTileFactory`] is the built-in
//! implementation; real imagery generators plug in through the same traits.

mod placeholder;
mod tile;

pub use placeholder::{PlaceholderTile, PlaceholderTileFactory, PLACEHOLDER_RGBA};
pub use tile::{clamp_range, ProviderError, TileProvider, TileProviderFactory};
