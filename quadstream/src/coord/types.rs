//! Tile coordinate and index types.

use std::fmt;

use thiserror::Error;

/// Deepest pyramid level that can be addressed.
///
/// The linear index of a tile at level `L` needs `2L + 2` bits, so level 30
/// keeps every index comfortably inside a `u64`.
pub const MAX_LEVEL: u8 = 30;

/// Errors produced when building or decoding tile addresses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    /// Level exceeds [`MAX_LEVEL`].
    #[error("Invalid level: {0} (max: {MAX_LEVEL})")]
    InvalidLevel(u8),

    /// Column or row lies outside the `2^level × 2^level` grid.
    #[error("Tile {x},{y} is outside the grid at level {level}")]
    OutOfGrid { level: u8, x: u32, y: u32 },

    /// Index does not map to any tile at or above [`MAX_LEVEL`].
    #[error("Invalid tile index: {0}")]
    InvalidIndex(u64),
}

/// One of the four children of a tile.
///
/// Discriminants follow raster order: row 0 before row 1, column 0 before
/// column 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    /// Column 0, row 0.
    TopLeft = 0,
    /// Column 1, row 0.
    TopRight = 1,
    /// Column 0, row 1.
    BottomLeft = 2,
    /// Column 1, row 1.
    BottomRight = 3,
}

impl Quadrant {
    /// All quadrants in raster order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    /// Column/row offset of this quadrant inside its parent.
    #[inline]
    pub fn offset(self) -> (u32, u32) {
        match self {
            Quadrant::TopLeft => (0, 0),
            Quadrant::TopRight => (1, 0),
            Quadrant::BottomLeft => (0, 1),
            Quadrant::BottomRight => (1, 1),
        }
    }

    /// Builds a quadrant from its `0..=3` discriminant.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

/// Linear cache key derived from a [`TileCoord`].
///
/// Levels are laid out one after another: level `L` starts at
/// `(4^L - 1) / 3` and tiles within a level are stored row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileIndex(pub u64);

impl TileIndex {
    /// Returns the raw index value.
    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Address of one cell of the image pyramid.
///
/// Level 0 is the single root tile. At level `L` the grid has `2^L` columns
/// (`x`, increasing rightward) and `2^L` rows (`y`, increasing downward as
/// raster rows do).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Pyramid level (0 = root)
    pub level: u8,
    /// Column within the level
    pub x: u32,
    /// Row within the level
    pub y: u32,
}

impl TileCoord {
    /// The root tile.
    pub const ROOT: TileCoord = TileCoord {
        level: 0,
        x: 0,
        y: 0,
    };

    /// Creates a coordinate without validating it.
    pub const fn new(level: u8, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }

    /// Creates a coordinate, checking the level and grid bounds.
    pub fn try_new(level: u8, x: u32, y: u32) -> Result<Self, CoordError> {
        if level > MAX_LEVEL {
            return Err(CoordError::InvalidLevel(level));
        }
        let side = 1u64 << level;
        if x as u64 >= side || y as u64 >= side {
            return Err(CoordError::OutOfGrid { level, x, y });
        }
        Ok(Self { level, x, y })
    }

    /// Returns true for the level-0 tile.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.level == 0
    }

    /// Converts this coordinate to its linear cache index.
    #[inline]
    pub fn to_index(&self) -> TileIndex {
        let side = 1u64 << self.level;
        TileIndex(level_offset(self.level) + self.y as u64 * side + self.x as u64)
    }

    /// Decodes a linear index back into a coordinate.
    pub fn from_index(index: TileIndex) -> Result<Self, CoordError> {
        let raw = index.0;
        let mut level = 0u8;
        while level < MAX_LEVEL && level_offset(level + 1) <= raw {
            level += 1;
        }

        let within = raw - level_offset(level);
        let side = 1u64 << level;
        if within >= side * side {
            return Err(CoordError::InvalidIndex(raw));
        }

        Ok(Self {
            level,
            x: (within % side) as u32,
            y: (within / side) as u32,
        })
    }

    /// Returns the tile one level up that contains this tile.
    #[inline]
    pub fn parent(&self) -> Option<Self> {
        if self.level == 0 {
            return None;
        }
        Some(Self {
            level: self.level - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }

    /// Returns the child in the given quadrant.
    #[inline]
    pub fn child(&self, quadrant: Quadrant) -> Self {
        let (dx, dy) = quadrant.offset();
        Self {
            level: self.level + 1,
            x: self.x * 2 + dx,
            y: self.y * 2 + dy,
        }
    }

    /// Returns all four children in raster order.
    pub fn children(&self) -> [Self; 4] {
        Quadrant::ALL.map(|q| self.child(q))
    }

    /// Returns which quadrant of its parent this tile occupies.
    #[inline]
    pub fn quadrant(&self) -> Quadrant {
        match (self.x & 1, self.y & 1) {
            (0, 0) => Quadrant::TopLeft,
            (1, 0) => Quadrant::TopRight,
            (0, _) => Quadrant::BottomLeft,
            _ => Quadrant::BottomRight,
        }
    }

    /// Iterates over the strict ancestors of this tile, nearest first,
    /// ending with the root.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors { next: self.parent() }
    }

    /// Returns true if `other` is this tile or one of its descendants.
    pub fn contains(&self, other: &TileCoord) -> bool {
        if other.level < self.level {
            return false;
        }
        let shift = other.level - self.level;
        other.x >> shift == self.x && other.y >> shift == self.y
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.x, self.y)
    }
}

/// Iterator over a tile's ancestors, produced by [`TileCoord::ancestors`].
#[derive(Debug, Clone)]
pub struct Ancestors {
    next: Option<TileCoord>,
}

impl Iterator for Ancestors {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

/// Index of the first tile at `level`: `(4^level - 1) / 3`.
#[inline]
fn level_offset(level: u8) -> u64 {
    ((1u64 << (2 * level as u32)) - 1) / 3
}
