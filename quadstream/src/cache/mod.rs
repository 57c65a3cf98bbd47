//! Tile cache.
//!
//! Holds one [`TileInfo`] per tile the streamer has touched: its load
//! state, recency stamp and texture handle. Entries are created lazily and
//! only removed by eviction or teardown, which release their textures
//! through the [`TextureRegistry`](crate::texture::TextureRegistry).
//!
//! # Eviction
//!
//! [`TileCache::cleanup`] evicts by ascending `(time_stamp, priority)`, so
//! stale tiles go first and, among equally stale ones, the least useful.
//! Entries stamped in the current frame are never evicted.

mod entry;
mod tile_cache;

pub use entry::{TileInfo, TileState};
pub use tile_cache::TileCache;
