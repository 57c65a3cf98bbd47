//! Per-frame tile streaming.
//!
//! [`TileStreamer`] owns the cache, the request scheduler and the texture
//! registry for one image pyramid. The host calls [`TileStreamer::update`]
//! once per camera change; each call
//!
//! 1. applies fetches that finished since the last call,
//! 2. refines the quadtree for the new view,
//! 3. resolves every visible tile to its own texture or an ancestor's,
//!    within the per-frame new-texture budget,
//! 4. requests missing tiles in priority order and evicts stale ones.
//!
//! Fetch results are only applied inside `update`,
//! [`process_completions`](TileStreamer::process_completions) or
//! [`wait_for_completion`](TileStreamer::wait_for_completion), so they never
//! interleave with a refine pass.

mod metered;

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info};

use self::metered::MeteredRegistry;
use crate::cache::TileCache;
use crate::config::StreamConfig;
use crate::coord::TileCoord;
use crate::fallback::{fallback_uv, UvTransform};
use crate::hierarchy::{ConfigError, Extents, HierarchyConfig};
use crate::provider::{Credentials, TileFetcher};
use crate::refine::{Refiner, TileMetrics, ViewParams};
use crate::scene::{DrawCommand, Frame};
use crate::scheduler::{CompletionOutcome, FetchCompletion, RequestScheduler};
use crate::telemetry::{StreamMetrics, StreamSnapshot};
use crate::texture::{TextureHandle, TextureRegistry};

/// What a frame drew for one tile; compared between frames to detect change.
type DrawKey = (TileCoord, TextureHandle, UvTransform);

/// Streams one image pyramid into a scene.
pub struct TileStreamer<F: TileFetcher, R: TextureRegistry> {
    hierarchy: HierarchyConfig,
    config: StreamConfig,
    cache: TileCache,
    scheduler: RequestScheduler<F>,
    refiner: Refiner,
    registry: R,
    metrics: Arc<StreamMetrics>,
    loaded_since_frame: bool,
    last_frame: Vec<DrawKey>,
    torn_down: bool,
}

impl<F: TileFetcher, R: TextureRegistry> TileStreamer<F, R> {
    /// Validates `hierarchy` and requests the root tile.
    ///
    /// Fetches are spawned on `runtime`.
    pub fn new(
        hierarchy: HierarchyConfig,
        config: StreamConfig,
        fetcher: Arc<F>,
        registry: R,
        runtime: Handle,
    ) -> Result<Self, ConfigError> {
        hierarchy.validate()?;

        let credentials = hierarchy.session_id().map(Credentials::new);
        let scheduler = RequestScheduler::new(
            fetcher,
            runtime,
            config.max_concurrent_requests,
            config.fetch.clone(),
            credentials,
        );

        let mut streamer = Self {
            cache: TileCache::new(config.cache_capacity),
            refiner: Refiner::new(config.max_splits),
            hierarchy,
            config,
            scheduler,
            registry,
            metrics: Arc::new(StreamMetrics::new()),
            loaded_since_frame: false,
            last_frame: Vec::new(),
            torn_down: false,
        };

        streamer.request_root();
        info!(
            url = %streamer.hierarchy.url_pattern(),
            deferred = streamer.hierarchy.is_deferred(),
            max_level = streamer.hierarchy.max_level(),
            "Tile streamer started"
        );
        Ok(streamer)
    }

    /// The pyramid description, back-filled once a deferred root loads.
    pub fn hierarchy(&self) -> &HierarchyConfig {
        &self.hierarchy
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn fetcher(&self) -> &Arc<F> {
        self.scheduler.fetcher()
    }

    /// Shared handle to the counters, for reporting from another thread.
    pub fn metrics(&self) -> Arc<StreamMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        self.metrics.snapshot()
    }

    /// Fetches issued and not yet applied.
    pub fn in_flight(&self) -> usize {
        self.scheduler.in_flight()
    }

    /// Returns true once the root tile is loaded and frames have content.
    pub fn is_ready(&self) -> bool {
        self.cache.is_loaded(&TileCoord::ROOT)
    }

    /// Applies every fetch that has finished, without waiting.
    ///
    /// Returns the number of completions applied.
    pub fn process_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Some(completion) = self.scheduler.try_next_completion() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// Waits for the next fetch to finish and applies it.
    ///
    /// Returns false immediately if nothing is in flight.
    pub async fn wait_for_completion(&mut self) -> bool {
        match self.scheduler.next_completion().await {
            Some(completion) => {
                self.apply(completion);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, completion: FetchCompletion) {
        let coord = completion.coord;
        let mut registry = MeteredRegistry::new(&mut self.registry, &self.metrics);
        let outcome = self.scheduler.apply_completion(
            completion,
            &mut self.cache,
            &mut self.hierarchy,
            &mut registry,
        );

        match outcome {
            CompletionOutcome::Loaded { .. } => {
                self.metrics.tile_loaded();
                self.loaded_since_frame = true;
                if coord.is_root() {
                    info!(extents = ?self.hierarchy.extents(), "Root tile loaded");
                }
            }
            CompletionOutcome::Failed { .. } => self.metrics.fetch_failed(),
            CompletionOutcome::Discarded => self.metrics.completion_discarded(),
        }
    }

    fn request_root(&mut self) {
        if self
            .scheduler
            .request(&mut self.cache, &self.hierarchy, &TileCoord::ROOT)
        {
            self.metrics.requests_issued(1);
        }
    }

    /// Computes the frame for `view`.
    ///
    /// Until the root tile has loaded the frame is empty.
    pub fn update(&mut self, view: &ViewParams) -> Frame {
        self.cache.advance_clock();
        self.metrics.frame();
        self.process_completions();

        let extents = match self.hierarchy.extents() {
            Some(extents) if self.is_ready() => extents,
            _ => {
                // Retries a root whose fetch failed once its delay has passed
                self.request_root();
                return self.finish_frame(Vec::new());
            }
        };

        let output = self.refiner.refine(&self.cache, &extents, view);
        let metrics = TileMetrics::new(&extents, view);

        let mut budget = self.config.new_textures_per_frame;
        let mut deferred = 0;
        let mut commands = Vec::with_capacity(output.visible.len());
        for tile in &output.visible {
            if let Some(command) = self.resolve(&extents, tile, &mut budget, &mut deferred) {
                commands.push(command);
            }
            self.cache.touch(tile);
            for ancestor in tile.ancestors() {
                self.cache.touch(&ancestor);
            }
        }

        let issued = self.scheduler.request_batch(
            &mut self.cache,
            &self.hierarchy,
            &output.pending,
            |tile| metrics.priority(tile),
        );
        self.metrics.requests_issued(issued);

        let mut registry = MeteredRegistry::new(&mut self.registry, &self.metrics);
        let evicted = self
            .cache
            .cleanup(issued, |tile| metrics.priority(tile), &mut registry);
        self.metrics.tiles_evicted(evicted);

        let fallbacks = commands.iter().filter(|c| c.fallback).count();
        self.metrics.fallback_draws(fallbacks);
        self.metrics.budget_deferrals(deferred);
        debug!(
            visible = commands.len(),
            fallbacks,
            deferred,
            issued,
            evicted,
            in_flight = self.scheduler.in_flight(),
            cached = self.cache.len(),
            "Frame updated"
        );

        self.finish_frame(commands)
    }

    /// Draw command for `tile`: its own texture if loaded and within budget,
    /// otherwise the best ancestor's.
    fn resolve(
        &mut self,
        extents: &Extents,
        tile: &TileCoord,
        budget: &mut usize,
        deferred: &mut usize,
    ) -> Option<DrawCommand> {
        let rect = extents.tile_rect(tile);

        if let Some(entry) = self.cache.get(tile) {
            if let Some(texture) = entry.texture() {
                // The root is the last fallback and never waits for budget
                let exempt = tile.is_root();
                if entry.is_displayed() || exempt || *budget > 0 {
                    if self.cache.mark_displayed(tile) && !exempt {
                        *budget -= 1;
                    }
                    return Some(DrawCommand::new(
                        *tile,
                        &rect,
                        texture,
                        UvTransform::IDENTITY,
                        false,
                    ));
                }
                *deferred += 1;
            }
        }

        let source = self.fallback_source(tile)?;
        let texture = self.cache.get(&source)?.texture()?;
        let uv = fallback_uv(extents, tile, &source);
        Some(DrawCommand::new(*tile, &rect, texture, uv, true))
    }

    /// Nearest ancestor already on screen, or failing that the nearest loaded
    /// one, which then becomes resident.
    fn fallback_source(&mut self, tile: &TileCoord) -> Option<TileCoord> {
        let mut nearest_loaded = None;
        for ancestor in tile.ancestors() {
            match self.cache.get(&ancestor) {
                Some(entry) if entry.is_loaded() && entry.is_displayed() => return Some(ancestor),
                Some(entry) if entry.is_loaded() && nearest_loaded.is_none() => {
                    nearest_loaded = Some(ancestor);
                }
                _ => {}
            }
        }
        let source = nearest_loaded?;
        self.cache.mark_displayed(&source);
        Some(source)
    }

    /// A frame counts as changed if a tile loaded since the last one or the
    /// drawn (tile, texture, uv) list differs.
    fn finish_frame(&mut self, commands: Vec<DrawCommand>) -> Frame {
        let keys: Vec<DrawKey> = commands
            .iter()
            .map(|c| (c.tile, c.texture, c.uv))
            .collect();
        let changed = self.loaded_since_frame || keys != self.last_frame;
        self.loaded_since_frame = false;
        self.last_frame = keys;
        Frame { commands, changed }
    }

    /// Releases every texture and empties the cache.
    ///
    /// Fetches still in flight are discarded when they finish. Also runs on
    /// drop.
    pub fn teardown(&mut self) -> usize {
        let mut registry = MeteredRegistry::new(&mut self.registry, &self.metrics);
        let disposed = self.cache.teardown(&mut registry);
        self.last_frame.clear();
        if !self.torn_down {
            info!(disposed, "Tile streamer torn down");
        }
        self.torn_down = true;
        disposed
    }
}

impl<F: TileFetcher, R: TextureRegistry> Drop for TileStreamer<F, R> {
    fn drop(&mut self) {
        if !self.torn_down {
            self.teardown();
        }
    }
}
