//! Atomic stream counters.

use std::sync::atomic::{AtomicU64, Ordering};

use super::snapshot::StreamSnapshot;

/// Counters describing everything a streamer has done since creation.
///
/// All updates use relaxed atomics, so a metrics instance can be shared via
/// `Arc` with a reporting thread while the streamer keeps running.
#[derive(Debug, Default)]
pub struct StreamMetrics {
    requests_issued: AtomicU64,
    tiles_loaded: AtomicU64,
    fetch_failures: AtomicU64,
    completions_discarded: AtomicU64,
    tiles_evicted: AtomicU64,
    textures_registered: AtomicU64,
    textures_released: AtomicU64,
    fallback_draws: AtomicU64,
    budget_deferrals: AtomicU64,
    frames: AtomicU64,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests_issued(&self, count: usize) {
        self.requests_issued
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn tile_loaded(&self) {
        self.tiles_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_failed(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A completion arrived for a tile that was evicted or re-requested.
    pub fn completion_discarded(&self) {
        self.completions_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tiles_evicted(&self, count: usize) {
        self.tiles_evicted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn texture_registered(&self) {
        self.textures_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn texture_released(&self) {
        self.textures_released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fallback_draws(&self, count: usize) {
        self.fallback_draws
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Ready tiles drawn from an ancestor because the upload budget ran out.
    pub fn budget_deferrals(&self, count: usize) {
        self.budget_deferrals
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    pub fn snapshot(&self) -> StreamSnapshot {
        StreamSnapshot {
            requests_issued: self.requests_issued.load(Ordering::Relaxed),
            tiles_loaded: self.tiles_loaded.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            completions_discarded: self.completions_discarded.load(Ordering::Relaxed),
            tiles_evicted: self.tiles_evicted.load(Ordering::Relaxed),
            textures_registered: self.textures_registered.load(Ordering::Relaxed),
            textures_released: self.textures_released.load(Ordering::Relaxed),
            fallback_draws: self.fallback_draws.load(Ordering::Relaxed),
            budget_deferrals: self.budget_deferrals.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
        }
    }
}
