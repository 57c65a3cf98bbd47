//! Per-frame draw output.
//!
//! A [`Frame`] is a flat list of textured quads in the root tile's unit
//! square (`z = 0`), plus a flag telling the host whether anything changed
//! since the previous frame.

use glam::{Vec2, Vec3};

use crate::coord::TileCoord;
use crate::fallback::UvTransform;
use crate::hierarchy::Rect;
use crate::texture::TextureHandle;

/// One textured quad.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// Tile whose footprint the quad covers
    pub tile: TileCoord,
    /// Centre of the quad in world space
    pub position: Vec3,
    /// Width and height of the quad in world units
    pub scale: Vec2,
    /// Texture to sample; an ancestor's when `fallback` is set
    pub texture: TextureHandle,
    /// Sub-rectangle of `texture` to sample
    pub uv: UvTransform,
    /// True if the quad borrows an ancestor's texture
    pub fallback: bool,
}

impl DrawCommand {
    /// Quad covering `rect`.
    pub fn new(
        tile: TileCoord,
        rect: &Rect,
        texture: TextureHandle,
        uv: UvTransform,
        fallback: bool,
    ) -> Self {
        let centre = (rect.min + rect.max) * 0.5;
        let size = rect.size();
        Self {
            tile,
            position: Vec3::new(centre.x as f32, centre.y as f32, 0.0),
            scale: Vec2::new(size.x as f32, size.y as f32),
            texture,
            uv,
            fallback,
        }
    }
}

/// Everything to draw for one camera update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub commands: Vec<DrawCommand>,
    /// True if the host should redraw.
    pub changed: bool,
}

impl Frame {
    /// A frame with nothing to draw.
    pub fn empty(changed: bool) -> Self {
        Self {
            commands: Vec::new(),
            changed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Number of quads drawn from an ancestor's texture.
    pub fn fallback_count(&self) -> usize {
        self.commands.iter().filter(|c| c.fallback).count()
    }

    /// Finds the quad drawn for `tile`.
    pub fn command_for(&self, tile: &TileCoord) -> Option<&DrawCommand> {
        self.commands.iter().find(|c| c.tile == *tile)
    }
}
