//! Tile addressing for the image pyramid.
//!
//! Provides the bijection between a `(level, x, y)` tile coordinate and the
//! linear [`TileIndex`] used as the cache key, plus parent/child navigation
//! through the quadtree.
//!
//! # Example
//!
//! ```
//! use quadstream::coord::{Quadrant, TileCoord};
//!
//! let tile = TileCoord::new(3, 5, 2);
//! let index = tile.to_index();
//! assert_eq!(TileCoord::from_index(index).unwrap(), tile);
//!
//! let parent = tile.parent().unwrap();
//! assert_eq!(parent.child(tile.quadrant()), tile);
//! assert_eq!(TileCoord::ROOT.child(Quadrant::BottomRight), TileCoord::new(1, 1, 1));
//! ```

mod types;

pub use types::{Ancestors, CoordError, Quadrant, TileCoord, TileIndex, MAX_LEVEL};
