//! Image pyramid description.
//!
//! A [`HierarchyConfig`] says where tiles come from (the URL template) and
//! how big the image is; [`Extents`] turns that into geometry: the root tile
//! size, the fraction of the root covered by real pixels, per-tile crop
//! factors and world-space rectangles.
//!
//! # URL Template
//!
//! The template may contain `{x}`, `{y}` and `{z}`. `{z}` is the tile level
//! plus the configured level offset, so a pyramid whose coarsest level is
//! served as zoom 8 uses `with_level_offset(8)`.

mod config;
mod error;
mod extents;

pub use config::{HierarchyConfig, HierarchyConfigBuilder, RootLoadedCallback, RootResolved};
pub use error::ConfigError;
pub use extents::{Crop, Extents, Rect};

pub(crate) use extents::level_scale;
