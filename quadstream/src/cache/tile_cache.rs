//! Tile cache with frame-safe LRU eviction.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use tracing::debug;

use super::entry::{TileInfo, TileState};
use crate::coord::{TileCoord, TileIndex};
use crate::texture::{TextureHandle, TextureRegistry};

/// Map from tile index to tile state, bounded by an entry capacity.
///
/// The cache owns the recency clock. Every touch stamps an entry with the
/// current clock value; [`cleanup`](Self::cleanup) evicts the oldest,
/// least important entries first and never evicts anything stamped with the
/// current value, so tiles used this frame always survive. The root tile is
/// never evicted since every fallback chain ends there.
#[derive(Debug)]
pub struct TileCache {
    entries: HashMap<TileIndex, TileInfo>,
    capacity: usize,
    clock: u64,
}

impl TileCache {
    /// Creates an empty cache holding up to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            clock: 0,
        }
    }

    /// Maximum number of entries kept after cleanup.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current recency clock value.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Advances the recency clock, starting a new frame.
    pub fn advance_clock(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Looks up an entry.
    pub fn get(&self, coord: &TileCoord) -> Option<&TileInfo> {
        self.entries.get(&coord.to_index())
    }

    /// Load state of `coord`; absent entries are `Missing`.
    pub fn state(&self, coord: &TileCoord) -> TileState {
        self.get(coord).map_or(TileState::Missing, TileInfo::state)
    }

    /// Returns true if `coord` is loaded.
    pub fn is_loaded(&self, coord: &TileCoord) -> bool {
        self.state(coord) == TileState::Loaded
    }

    /// Number of entries currently loading.
    pub fn loading_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.state() == TileState::Loading)
            .count()
    }

    /// Iterates over all entries.
    pub fn iter(&self) -> impl Iterator<Item = &TileInfo> {
        self.entries.values()
    }

    /// Returns the entry for `coord`, creating a `Missing` one stamped with
    /// the current clock if needed.
    pub fn ensure(&mut self, coord: &TileCoord) -> &TileInfo {
        self.ensure_mut(coord)
    }

    fn ensure_mut(&mut self, coord: &TileCoord) -> &mut TileInfo {
        let clock = self.clock;
        self.entries
            .entry(coord.to_index())
            .or_insert_with(|| TileInfo::new(*coord, clock))
    }

    /// Moves `coord` from `Missing` to `Loading` under `request_id`.
    ///
    /// Returns false if the entry was not `Missing`.
    pub fn mark_loading(&mut self, coord: &TileCoord, request_id: u64) -> bool {
        self.ensure_mut(coord).begin_loading(request_id)
    }

    /// Moves `coord` from `Loading` to `Loaded` and stamps it.
    ///
    /// Returns false, leaving the cache untouched, if the entry is absent or
    /// not loading.
    pub fn mark_loaded(&mut self, coord: &TileCoord, texture: TextureHandle) -> bool {
        let clock = self.clock;
        self.entries
            .get_mut(&coord.to_index())
            .is_some_and(|entry| entry.finish_loading(texture, clock))
    }

    /// Returns a failed `Loading` entry to `Missing`.
    ///
    /// `retry_after` is when it may be requested again; `None` gives up on it.
    pub fn mark_failed(&mut self, coord: &TileCoord, retry_after: Option<Instant>) -> bool {
        self.entries
            .get_mut(&coord.to_index())
            .is_some_and(|entry| entry.fail_loading(retry_after))
    }

    /// Returns true if `coord` is loading under exactly `request_id`.
    pub fn is_pending(&self, coord: &TileCoord, request_id: u64) -> bool {
        self.get(coord).is_some_and(|entry| {
            entry.state() == TileState::Loading && entry.request_id() == Some(request_id)
        })
    }

    /// Stamps `coord` with the current clock without changing its state.
    pub fn touch(&mut self, coord: &TileCoord) {
        let clock = self.clock;
        if let Some(entry) = self.entries.get_mut(&coord.to_index()) {
            entry.set_time_stamp(clock);
        }
    }

    /// Records that `coord` has been drawn with its own texture.
    ///
    /// Returns true the first time, when the texture becomes GPU-resident.
    pub fn mark_displayed(&mut self, coord: &TileCoord) -> bool {
        match self.entries.get_mut(&coord.to_index()) {
            Some(entry) if entry.is_loaded() && !entry.is_displayed() => {
                entry.mark_displayed();
                true
            }
            _ => false,
        }
    }

    /// Releases the entry's texture and removes it.
    ///
    /// Returns false if there was no entry.
    pub fn dispose(&mut self, coord: &TileCoord, registry: &mut dyn TextureRegistry) -> bool {
        self.dispose_index(coord.to_index(), registry)
    }

    fn dispose_index(&mut self, index: TileIndex, registry: &mut dyn TextureRegistry) -> bool {
        match self.entries.remove(&index) {
            Some(mut entry) => {
                if let Some(texture) = entry.take_texture() {
                    registry.release_texture(texture);
                }
                debug!(tile = %entry.coord(), state = %entry.state(), "Tile disposed");
                true
            }
            None => false,
        }
    }

    /// Evicts entries so that `required_free` more can be added within
    /// capacity.
    ///
    /// Candidates are ordered by ascending `(time_stamp, priority)`; eviction
    /// stops early at the first entry stamped with the current clock, so the
    /// cache may transiently exceed its capacity rather than drop tiles in
    /// use. Returns the number of entries evicted.
    pub fn cleanup(
        &mut self,
        required_free: usize,
        priority: impl Fn(&TileCoord) -> f64,
        registry: &mut dyn TextureRegistry,
    ) -> usize {
        let wanted = self.entries.len() + required_free;
        if wanted <= self.capacity {
            return 0;
        }
        let mut deficit = wanted - self.capacity;

        let mut candidates: Vec<(u64, f64, TileIndex)> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.coord().is_root())
            .map(|(index, entry)| (entry.time_stamp(), priority(&entry.coord()), *index))
            .collect();
        candidates.sort_by(|a, b| match a.0.cmp(&b.0) {
            Ordering::Equal => a.1.total_cmp(&b.1),
            other => other,
        });

        let mut evicted = 0;
        for (time_stamp, _, index) in candidates {
            if deficit == 0 || time_stamp >= self.clock {
                break;
            }
            if self.dispose_index(index, registry) {
                deficit -= 1;
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!(evicted, remaining = self.entries.len(), "Cache cleanup");
        }
        evicted
    }

    /// Disposes every entry, releasing all textures.
    pub fn teardown(&mut self, registry: &mut dyn TextureRegistry) -> usize {
        let indices: Vec<TileIndex> = self.entries.keys().copied().collect();
        let count = indices.len();
        for index in indices {
            self.dispose_index(index, registry);
        }
        count
    }
}
