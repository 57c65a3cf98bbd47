//! Ancestor-texture fallback geometry.
//!
//! A tile whose own texture is not ready is drawn with the texture of its
//! nearest loaded ancestor, sampled through a UV sub-rectangle. The texture
//! of a tile covers only its cropped footprint, so the sub-rectangle is
//! divided by the ancestor's crop factor and scaled by the tile's own.
//!
//! UV space has `v` pointing up while raster rows run down, so the
//! vertical offset is measured from the bottom of the ancestor's texture.
//!
//! # Example
//!
//! ```
//! use quadstream::coord::TileCoord;
//! use quadstream::fallback::fallback_uv;
//! use quadstream::hierarchy::Extents;
//!
//! let extents = Extents { tile_size: 256, max_level: 2, width: 1024, height: 1024 };
//! // Top-right quarter of the root texture
//! let uv = fallback_uv(&extents, &TileCoord::new(1, 1, 0), &TileCoord::ROOT);
//! assert_eq!((uv.offset.x, uv.offset.y), (0.5, 0.5));
//! assert_eq!((uv.scale.x, uv.scale.y), (0.5, 0.5));
//! ```

use glam::{DVec2, Vec4};

use crate::cache::TileCache;
use crate::coord::TileCoord;
use crate::hierarchy::{level_scale, Extents};

/// Affine map from a quad's local `[0, 1]²` UVs into a texture:
/// `uv' = offset + uv * scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvTransform {
    pub offset: DVec2,
    pub scale: DVec2,
}

impl UvTransform {
    /// Samples the whole texture.
    pub const IDENTITY: UvTransform = UvTransform {
        offset: DVec2::ZERO,
        scale: DVec2::ONE,
    };

    pub fn new(offset: DVec2, scale: DVec2) -> Self {
        Self { offset, scale }
    }

    /// Maps a local UV into texture space.
    pub fn apply(&self, uv: DVec2) -> DVec2 {
        self.offset + uv * self.scale
    }

    /// `(u_offset, v_offset, u_scale, v_scale)` for shader uniforms.
    pub fn to_vec4(&self) -> Vec4 {
        Vec4::new(
            self.offset.x as f32,
            self.offset.y as f32,
            self.scale.x as f32,
            self.scale.y as f32,
        )
    }
}

impl Default for UvTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// UV sub-rectangle of `ancestor`'s texture covering `tile`'s footprint.
///
/// `ancestor` must contain `tile`. Passing the tile itself yields
/// [`UvTransform::IDENTITY`], as does an ancestor without image data.
pub fn fallback_uv(extents: &Extents, tile: &TileCoord, ancestor: &TileCoord) -> UvTransform {
    if tile.level <= ancestor.level || !ancestor.contains(tile) {
        return UvTransform::IDENTITY;
    }
    let ancestor_crop = extents.crop(ancestor);
    if ancestor_crop.is_empty() {
        return UvTransform::IDENTITY;
    }
    let tile_crop = extents.crop(tile);

    let diff = tile.level - ancestor.level;
    let step = 1.0 / level_scale(diff);
    let ix = (tile.x - (ancestor.x << diff)) as f64;
    let iy = (tile.y - (ancestor.y << diff)) as f64;

    let u_offset = ix * step / ancestor_crop.x;
    let u_scale = step * tile_crop.x / ancestor_crop.x;
    let v_scale = step * tile_crop.y / ancestor_crop.y;
    let v_offset = 1.0 - (iy * step + step * tile_crop.y) / ancestor_crop.y;

    UvTransform::new(DVec2::new(u_offset, v_offset), DVec2::new(u_scale, v_scale))
}

/// Nearest strict ancestor of `tile` whose texture is loaded.
///
/// Walks parents iteratively; once the root is loaded this always succeeds.
pub fn nearest_loaded_ancestor(cache: &TileCache, tile: &TileCoord) -> Option<TileCoord> {
    tile.ancestors().find(|ancestor| cache.is_loaded(ancestor))
}
