//! View frustum for visibility tests.

use glam::{DMat4, DVec3, DVec4};

use crate::hierarchy::Rect;

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Flat box for a rectangle lying in the `z = 0` plane.
    pub fn from_rect(rect: &Rect) -> Self {
        Self::new(rect.min.extend(0.0), rect.max.extend(0.0))
    }

    /// Euclidean distance from `point` to the box; zero inside it.
    pub fn distance_to(&self, point: DVec3) -> f64 {
        let nearest = point.clamp(self.min, self.max);
        point.distance(nearest)
    }

    /// Corner furthest along `direction`.
    fn positive_vertex(&self, direction: DVec3) -> DVec3 {
        DVec3::new(
            if direction.x >= 0.0 { self.max.x } else { self.min.x },
            if direction.y >= 0.0 { self.max.y } else { self.min.y },
            if direction.z >= 0.0 { self.max.z } else { self.min.z },
        )
    }
}

/// Six clip planes (left, right, bottom, top, near, far) with normals
/// pointing inward.
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    pub planes: [DVec4; 6],
}

impl Frustum {
    /// Extracts the planes from a view-projection matrix with `[0, 1]` clip
    /// depth, as built by [`DMat4::perspective_rh`].
    pub fn from_view_proj(view_proj: &DMat4) -> Self {
        let m = view_proj.transpose();
        let planes = [
            m.w_axis + m.x_axis,
            m.w_axis - m.x_axis,
            m.w_axis + m.y_axis,
            m.w_axis - m.y_axis,
            m.z_axis,
            m.w_axis - m.z_axis,
        ];
        Self {
            planes: planes.map(normalize_plane),
        }
    }

    /// Frustum of a right-handed perspective camera at `eye` looking at
    /// `target`.
    pub fn perspective(
        eye: DVec3,
        target: DVec3,
        up: DVec3,
        fov_y: f64,
        aspect: f64,
        near: f64,
        far: f64,
    ) -> Self {
        let proj = DMat4::perspective_rh(fov_y, aspect, near, far);
        let view = DMat4::look_at_rh(eye, target, up);
        Self::from_view_proj(&(proj * view))
    }

    /// Returns true if any part of `aabb` may be inside the frustum.
    ///
    /// Conservative: boxes near a frustum corner can pass even when they are
    /// just outside.
    pub fn intersects(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            normal.dot(aabb.positive_vertex(normal)) + plane.w >= 0.0
        })
    }

    /// Returns true if `point` is inside every plane.
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(point) + plane.w >= 0.0)
    }
}

fn normalize_plane(plane: DVec4) -> DVec4 {
    let length = plane.truncate().length();
    if length > 0.0 {
        plane / length
    } else {
        plane
    }
}
