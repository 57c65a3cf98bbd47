//! Screen-space priority and projected size.

use glam::DVec3;

use super::frustum::{Aabb, Frustum};
use crate::coord::TileCoord;
use crate::hierarchy::Extents;

/// Priority multiplier for tiles inside the view frustum.
pub const VISIBLE_BONUS: f64 = 100.0;

/// Priority multiplier for tiles outside the view frustum.
pub const HIDDEN_BONUS: f64 = 1.0;

/// Lower bound on squared distance, keeping priorities finite when the
/// camera touches a tile.
pub const MIN_DISTANCE_SQUARED: f64 = 1e-12;

/// Camera state for one refine pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewParams {
    /// Current view frustum
    pub frustum: Frustum,
    /// Camera position in world space
    pub camera_position: DVec3,
    /// Vertical field of view in radians
    pub fov_y: f64,
    /// Viewport width in pixels
    pub viewport_width: f64,
}

impl ViewParams {
    pub fn new(frustum: Frustum, camera_position: DVec3, fov_y: f64, viewport_width: f64) -> Self {
        Self {
            frustum,
            camera_position,
            fov_y,
            viewport_width,
        }
    }

    /// Builds the view of a perspective camera at `eye` looking at `target`.
    pub fn look_at(
        eye: DVec3,
        target: DVec3,
        fov_y: f64,
        viewport_width: f64,
        viewport_height: f64,
    ) -> Self {
        let aspect = viewport_width / viewport_height.max(1.0);
        let up = if (target - eye).normalize_or_zero().abs().abs_diff_eq(DVec3::Y, 1e-9) {
            DVec3::Z
        } else {
            DVec3::Y
        };
        let far = (eye.length() + 10.0) * 4.0;
        let frustum = Frustum::perspective(eye, target, up, fov_y, aspect, 1e-4, far);
        Self::new(frustum, eye, fov_y, viewport_width)
    }
}

/// Priority and screen-size calculations for tiles of one pyramid.
#[derive(Debug, Clone, Copy)]
pub struct TileMetrics<'a> {
    extents: &'a Extents,
    view: &'a ViewParams,
}

impl<'a> TileMetrics<'a> {
    pub fn new(extents: &'a Extents, view: &'a ViewParams) -> Self {
        Self { extents, view }
    }

    /// World-space bounding box of the tile's image data.
    pub fn bounds(&self, tile: &TileCoord) -> Aabb {
        Aabb::from_rect(&self.extents.tile_rect(tile))
    }

    /// Distance from the camera to the tile's bounding box.
    pub fn distance(&self, tile: &TileCoord) -> f64 {
        self.bounds(tile).distance_to(self.view.camera_position)
    }

    /// Returns true if the tile's bounding box intersects the frustum.
    pub fn is_visible(&self, tile: &TileCoord) -> bool {
        self.view.frustum.intersects(&self.bounds(tile))
    }

    /// `bonus * edge² / max(distance², ε)`, with a bonus of 100 for tiles in
    /// view and 1 otherwise.
    pub fn priority(&self, tile: &TileCoord) -> f64 {
        let bonus = if self.is_visible(tile) {
            VISIBLE_BONUS
        } else {
            HIDDEN_BONUS
        };
        let distance = self.distance(tile);
        let edge = Extents::edge_length(tile.level);
        bonus * edge * edge / (distance * distance).max(MIN_DISTANCE_SQUARED)
    }

    /// Projected edge length of the tile in pixels.
    pub fn screen_size(&self, tile: &TileCoord) -> f64 {
        projected_size(
            Extents::edge_length(tile.level),
            self.distance(tile),
            self.view.fov_y,
            self.view.viewport_width,
        )
    }
}

/// Pinhole projection: `0.5 * edge / (tan(fov / 2) * distance) * viewport`.
///
/// A zero distance projects to infinity.
pub fn projected_size(edge: f64, distance: f64, fov_y: f64, viewport_width: f64) -> f64 {
    0.5 * edge / ((fov_y / 2.0).tan() * distance) * viewport_width
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extents() -> Extents {
        Extents {
            tile_size: 256,
            max_level: 4,
            width: 4096,
            height: 4096,
        }
    }

    fn view_from(eye: DVec3) -> ViewParams {
        ViewParams::look_at(eye, DVec3::new(0.5, 0.5, 0.0), 60f64.to_radians(), 1024.0, 768.0)
    }

    #[test]
    fn test_visible_tile_gets_hundredfold_priority() {
        let extents = extents();
        // Camera just above the image, looking along +x. Heights and edges
        // are powers of two so the ratio comes out exact.
        let view = ViewParams::look_at(
            DVec3::new(0.5, 0.5, 0.0625),
            DVec3::new(1.5, 0.5, 0.0625),
            60f64.to_radians(),
            1024.0,
            1024.0,
        );
        let metrics = TileMetrics::new(&extents, &view);

        // Same level and distance, mirrored across x = 0.5
        let ahead = TileCoord::new(2, 2, 1);
        let behind = TileCoord::new(2, 1, 1);
        assert_eq!(metrics.distance(&ahead), metrics.distance(&behind));
        assert!(metrics.is_visible(&ahead));
        assert!(!metrics.is_visible(&behind));

        let ratio = metrics.priority(&ahead) / metrics.priority(&behind);
        assert_eq!(ratio, VISIBLE_BONUS);
    }

    #[test]
    fn test_priority_is_finite_at_zero_distance() {
        let extents = extents();
        let view = ViewParams::look_at(
            DVec3::new(0.5, 0.5, 0.0),
            DVec3::new(0.5, 0.5, -1.0),
            60f64.to_radians(),
            1024.0,
            768.0,
        );
        let metrics = TileMetrics::new(&extents, &view);
        assert!(metrics.priority(&TileCoord::ROOT).is_finite());
    }

    #[test]
    fn test_closer_tiles_rank_higher() {
        let extents = extents();
        let view = ViewParams::look_at(
            DVec3::new(0.1, 0.9, 0.5),
            DVec3::new(0.1, 0.9, 0.0),
            60f64.to_radians(),
            1024.0,
            768.0,
        );
        let metrics = TileMetrics::new(&extents, &view);
        let near = TileCoord::new(3, 0, 0);
        let far = TileCoord::new(3, 7, 7);
        assert!(metrics.priority(&near) > metrics.priority(&far));
    }

    #[test]
    fn test_projected_size() {
        // 90° field of view: tan(45°) = 1
        let size = projected_size(1.0, 1.0, std::f64::consts::FRAC_PI_2, 1000.0);
        assert!((size - 500.0).abs() < 1e-9);
        assert!(projected_size(1.0, 0.0, 1.0, 1000.0).is_infinite());
    }

    #[test]
    fn test_screen_size_shrinks_with_level() {
        let extents = extents();
        let view = view_from(DVec3::new(0.5, 0.5, 2.0));
        let metrics = TileMetrics::new(&extents, &view);
        // Half the edge and no closer to the camera
        let coarse = metrics.screen_size(&TileCoord::new(1, 0, 0));
        let fine = metrics.screen_size(&TileCoord::new(2, 0, 0));
        assert!(fine < coarse);
    }
}
