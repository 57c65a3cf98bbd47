//! Runtime limits for a streamer.

use crate::refine::DEFAULT_MAX_SPLITS;
use crate::scheduler::{FetchPolicy, DEFAULT_MAX_CONCURRENT_REQUESTS};

/// Default number of cache entries kept after cleanup.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Default number of tiles allowed to show their own texture for the first
/// time in one frame.
pub const DEFAULT_NEW_TEXTURES_PER_FRAME: usize = 5;

/// Limits controlling cache size, fetch concurrency and per-frame work.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamConfig {
    /// Cache entries kept after cleanup.
    pub cache_capacity: usize,

    /// Simultaneous fetches (K).
    pub max_concurrent_requests: usize,

    /// New textures displayed per frame (N).
    pub new_textures_per_frame: usize,

    /// Expansion steps per refine pass.
    pub max_splits: usize,

    /// Timeout and retry behavior for fetches.
    pub fetch: FetchPolicy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            new_textures_per_frame: DEFAULT_NEW_TEXTURES_PER_FRAME,
            max_splits: DEFAULT_MAX_SPLITS,
            fetch: FetchPolicy::default(),
        }
    }
}

impl StreamConfig {
    /// Set the cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the fetch concurrency limit.
    pub fn with_max_concurrent_requests(mut self, limit: usize) -> Self {
        self.max_concurrent_requests = limit;
        self
    }

    /// Set the per-frame new texture budget; at least one.
    pub fn with_new_textures_per_frame(mut self, budget: usize) -> Self {
        self.new_textures_per_frame = budget.max(1);
        self
    }

    /// Set the refine step cap.
    pub fn with_max_splits(mut self, max_splits: usize) -> Self {
        self.max_splits = max_splits;
        self
    }

    /// Set the fetch policy.
    pub fn with_fetch_policy(mut self, fetch: FetchPolicy) -> Self {
        self.fetch = fetch;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_budget_is_at_least_one() {
        let config = StreamConfig::default().with_new_textures_per_frame(0);
        assert_eq!(config.new_textures_per_frame, 1);
        assert_eq!(
            StreamConfig::default().with_new_textures_per_frame(7).new_textures_per_frame,
            7
        );
    }
}
