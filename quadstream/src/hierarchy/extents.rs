//! Pyramid geometry.
//!
//! Everything here works in the root tile's unit square: the root covers
//! `[0, 1] × [0, 1]` in world units with raster row 0 at world `y = 1`,
//! so a tile's world rectangle is flipped relative to its raster position.

use glam::DVec2;

use crate::coord::TileCoord;

/// Axis-aligned rectangle in the root tile's unit square.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Lower-left corner
    pub min: DVec2,
    /// Upper-right corner
    pub max: DVec2,
}

impl Rect {
    /// Creates a rectangle from its corners.
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    /// Width and height.
    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    /// Returns true if the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }
}

/// Fraction of a tile's nominal footprint that holds real image pixels.
///
/// Interior tiles have a crop of `(1, 1)`; tiles on the right or bottom edge
/// of an image that is not an exact multiple of the tile grid are smaller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crop {
    /// Covered fraction along x
    pub x: f64,
    /// Covered fraction along y (raster rows)
    pub y: f64,
}

impl Crop {
    /// A fully covered tile.
    pub const FULL: Crop = Crop { x: 1.0, y: 1.0 };

    /// Returns true if no real pixels fall inside the tile.
    pub fn is_empty(&self) -> bool {
        self.x <= 0.0 || self.y <= 0.0
    }
}

/// Resolved resolution description of a single-root pyramid.
///
/// Obtained from [`HierarchyConfig::extents`](super::HierarchyConfig::extents)
/// once tile size and image dimensions are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extents {
    /// Edge length of one tile in pixels
    pub tile_size: u32,
    /// Deepest level of the pyramid
    pub max_level: u8,
    /// Full-resolution image width in pixels
    pub width: u32,
    /// Full-resolution image height in pixels
    pub height: u32,
}

impl Extents {
    /// Pixel size of the root tile's region at full resolution:
    /// `tile_size * 2^max_level`.
    pub fn root_tile_size(&self) -> u64 {
        (self.tile_size as u64) << self.max_level
    }

    /// Fraction of the root tile's width covered by the image.
    pub fn quad_width(&self) -> f64 {
        self.width as f64 / self.root_tile_size() as f64
    }

    /// Fraction of the root tile's height covered by the image.
    pub fn quad_height(&self) -> f64 {
        self.height as f64 / self.root_tile_size() as f64
    }

    /// The image's footprint in the root tile's unit square.
    ///
    /// The crop is anchored at the top of the raster, which is the top of
    /// world space, so the box spans `[(0, 1 - qh), (qw, 1)]`.
    pub fn bounding_box(&self) -> Rect {
        Rect::new(
            DVec2::new(0.0, 1.0 - self.quad_height()),
            DVec2::new(self.quad_width(), 1.0),
        )
    }

    /// Image width in pixels when sampled at `level`.
    pub fn level_width(&self, level: u8) -> f64 {
        self.width as f64 / level_scale(self.max_level.saturating_sub(level))
    }

    /// Image height in pixels when sampled at `level`.
    pub fn level_height(&self, level: u8) -> f64 {
        self.height as f64 / level_scale(self.max_level.saturating_sub(level))
    }

    /// Number of columns and rows holding image data at `level`.
    pub fn grid_size(&self, level: u8) -> (u32, u32) {
        let ts = self.tile_size as f64;
        (
            (self.level_width(level) / ts).ceil() as u32,
            (self.level_height(level) / ts).ceil() as u32,
        )
    }

    /// Crop factor of `tile`, clamped to `[0, 1]` in both axes.
    pub fn crop(&self, tile: &TileCoord) -> Crop {
        let ts = self.tile_size as f64;
        let x = (self.level_width(tile.level) - tile.x as f64 * ts) / ts;
        let y = (self.level_height(tile.level) - tile.y as f64 * ts) / ts;
        Crop {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    /// Returns true if any image pixel falls within `tile`.
    pub fn contains_data(&self, tile: &TileCoord) -> bool {
        !self.crop(tile).is_empty()
    }

    /// Edge length of a tile at `level` in world units.
    pub fn edge_length(level: u8) -> f64 {
        1.0 / level_scale(level)
    }

    /// The tile's nominal square in world space, ignoring the crop.
    pub fn tile_square(tile: &TileCoord) -> Rect {
        let edge = Self::edge_length(tile.level);
        let left = tile.x as f64 * edge;
        let top = 1.0 - tile.y as f64 * edge;
        Rect::new(DVec2::new(left, top - edge), DVec2::new(left + edge, top))
    }

    /// The part of the tile covered by image data, in world space.
    pub fn tile_rect(&self, tile: &TileCoord) -> Rect {
        let edge = Self::edge_length(tile.level);
        let crop = self.crop(tile);
        let left = tile.x as f64 * edge;
        let top = 1.0 - tile.y as f64 * edge;
        Rect::new(
            DVec2::new(left, top - edge * crop.y),
            DVec2::new(left + edge * crop.x, top),
        )
    }
}

/// `2^levels` as a float; exact for every level the pyramid can address.
#[inline]
pub(crate) fn level_scale(levels: u8) -> f64 {
    (1u64 << levels) as f64
}
