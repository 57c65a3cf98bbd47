//! Per-frame quadtree refinement.
//!
//! Each frame the [`Refiner`] walks the pyramid from the root, expanding the
//! tile with the highest screen-space priority until every drawn tile is
//! smaller on screen than one tile's worth of pixels, the pyramid bottoms
//! out, or the step cap is reached.
//!
//! Priority favours large, close tiles and multiplies by 100 for tiles inside
//! the view [`Frustum`]; the same score orders fetch requests and breaks
//! eviction ties.

mod frustum;
mod priority;
mod refiner;

pub use frustum::{Aabb, Frustum};
pub use priority::{
    projected_size, TileMetrics, ViewParams, HIDDEN_BONUS, MIN_DISTANCE_SQUARED, VISIBLE_BONUS,
};
pub use refiner::{Candidate, RefineOutput, Refiner, DEFAULT_MAX_SPLITS};
