//! Greedy quadtree refinement.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::trace;

use super::priority::{TileMetrics, ViewParams};
use crate::cache::TileCache;
use crate::coord::TileCoord;
use crate::hierarchy::Extents;

/// Default cap on expansion steps per refine pass.
pub const DEFAULT_MAX_SPLITS: usize = 100;

/// A tile waiting to be considered for refinement.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub tile: TileCoord,
    pub priority: f64,
}

impl Candidate {
    pub fn new(tile: TileCoord, priority: f64) -> Self {
        Self { tile, priority }
    }
}

// Ordering for BinaryHeap: higher priority first, then lower index first
impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.priority.total_cmp(&other.priority) {
            Ordering::Equal => other.tile.to_index().cmp(&self.tile.to_index()),
            other_ordering => other_ordering,
        }
    }
}

/// Result of one refine pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefineOutput {
    /// Tiles to draw this frame; they never overlap.
    pub visible: Vec<TileCoord>,
    /// Tiles worth fetching, in discovery order.
    pub pending: Vec<TileCoord>,
    /// Expansion steps taken.
    pub steps: usize,
}

/// Chooses which tiles to draw and which to fetch for one camera view.
///
/// Starting from the root, the refiner repeatedly takes the highest-priority
/// candidate and replaces it by its children if it projects larger than one
/// tile on screen. Only loaded children can stand in for their parent; the
/// rest are queued for fetching and drawn from an ancestor's texture in the
/// meantime. The number of steps is capped so a pass costs at most
/// `max_splits` expansions.
#[derive(Debug, Clone)]
pub struct Refiner {
    max_splits: usize,
}

impl Default for Refiner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SPLITS)
    }
}

impl Refiner {
    pub fn new(max_splits: usize) -> Self {
        Self { max_splits }
    }

    pub fn max_splits(&self) -> usize {
        self.max_splits
    }

    /// Runs one refine pass.
    ///
    /// Returns an empty output while the root tile is not loaded.
    pub fn refine(&self, cache: &TileCache, extents: &Extents, view: &ViewParams) -> RefineOutput {
        let mut output = RefineOutput::default();
        if !cache.is_loaded(&TileCoord::ROOT) {
            return output;
        }

        let metrics = TileMetrics::new(extents, view);
        let tile_size = extents.tile_size as f64;
        let mut queue = BinaryHeap::new();
        queue.push(Candidate::new(
            TileCoord::ROOT,
            metrics.priority(&TileCoord::ROOT),
        ));

        while output.steps < self.max_splits {
            let Some(Candidate { tile, .. }) = queue.pop() else {
                break;
            };
            output.steps += 1;

            if tile.level >= extents.max_level || metrics.screen_size(&tile) < tile_size {
                output.visible.push(tile);
                continue;
            }

            let children: Vec<TileCoord> = tile
                .children()
                .into_iter()
                .filter(|child| extents.contains_data(child))
                .collect();
            let refines = children
                .iter()
                .any(|child| child.level >= extents.max_level || cache.is_loaded(child));

            if !refines {
                // Nothing better to show yet; keep the parent on screen
                output.visible.push(tile);
                output.pending.extend(children);
                continue;
            }

            for child in children {
                let loaded = cache.is_loaded(&child);
                if loaded && child.level < extents.max_level {
                    queue.push(Candidate::new(child, metrics.priority(&child)));
                } else {
                    output.visible.push(child);
                    if !loaded {
                        output.pending.push(child);
                    }
                }
            }
        }

        // Out of steps: whatever is still queued is drawn as is
        output.visible.extend(queue.into_iter().map(|c| c.tile));

        trace!(
            steps = output.steps,
            visible = output.visible.len(),
            pending = output.pending.len(),
            "Refine pass"
        );
        output
    }
}
