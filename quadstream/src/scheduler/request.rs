//! Bounded-concurrency tile request scheduler.

use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::policy::FetchPolicy;
use crate::cache::{TileCache, TileState};
use crate::coord::TileCoord;
use crate::hierarchy::HierarchyConfig;
use crate::provider::{Credentials, FetchError, TileFetcher};
use crate::texture::{RawImage, TextureRegistry};

/// Default cap on simultaneous fetches.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 5;

/// Result of one fetch, delivered back to the cache-owning thread.
#[derive(Debug)]
pub struct FetchCompletion {
    /// The requested tile
    pub coord: TileCoord,
    /// Identifier the request was issued under
    pub request_id: u64,
    /// Decoded image or the failure
    pub result: Result<RawImage, FetchError>,
}

/// What applying a completion did to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The tile is now loaded.
    Loaded {
        /// True if this load back-filled a deferred hierarchy.
        resolved_extents: bool,
    },
    /// The fetch failed; the tile went back to `Missing`.
    Failed {
        /// True if the tile will be requested again after a delay.
        will_retry: bool,
    },
    /// The tile was evicted or re-requested meanwhile; the result was dropped.
    Discarded,
}

/// Issues tile fetches and feeds their results back into the cache.
///
/// Fetches run as Tokio tasks; each finished fetch is sent over a channel
/// and only applied when the owner calls
/// [`apply_completion`](Self::apply_completion), so cache mutation stays on
/// one thread.
pub struct RequestScheduler<F: TileFetcher> {
    fetcher: Arc<F>,
    runtime: Handle,
    completions_tx: mpsc::UnboundedSender<FetchCompletion>,
    completions_rx: mpsc::UnboundedReceiver<FetchCompletion>,
    max_concurrent: usize,
    in_flight: usize,
    next_request_id: u64,
    policy: FetchPolicy,
    credentials: Option<Credentials>,
}

impl<F: TileFetcher> RequestScheduler<F> {
    /// Creates a scheduler spawning fetches on `runtime`.
    pub fn new(
        fetcher: Arc<F>,
        runtime: Handle,
        max_concurrent: usize,
        policy: FetchPolicy,
        credentials: Option<Credentials>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            fetcher,
            runtime,
            completions_tx,
            completions_rx,
            max_concurrent: max_concurrent.max(1),
            in_flight: 0,
            next_request_id: 1,
            policy,
            credentials,
        }
    }

    /// Number of fetches issued but not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Concurrency limit.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Returns true if another fetch may start.
    pub fn has_capacity(&self) -> bool {
        self.in_flight < self.max_concurrent
    }

    /// The fetcher shared with running tasks.
    pub fn fetcher(&self) -> &Arc<F> {
        &self.fetcher
    }

    /// Requests `coord` unless it is already loading, loaded, waiting out a
    /// retry delay, or the concurrency limit is reached.
    ///
    /// Returns true if a fetch was issued.
    pub fn request(
        &mut self,
        cache: &mut TileCache,
        config: &HierarchyConfig,
        coord: &TileCoord,
    ) -> bool {
        if !self.has_capacity() {
            return false;
        }
        if !cache.ensure(coord).is_requestable(Instant::now()) {
            return false;
        }

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        if !cache.mark_loading(coord, request_id) {
            return false;
        }
        self.in_flight += 1;

        let url = config.tile_url(coord);
        debug!(tile = %coord, request_id, url = %url, "Requesting tile");
        self.spawn_fetch(*coord, request_id, url);
        true
    }

    fn spawn_fetch(&self, coord: TileCoord, request_id: u64, url: String) {
        let fetcher = Arc::clone(&self.fetcher);
        let credentials = self.credentials.clone();
        let timeout = self.policy.timeout;
        let mut reporter = CompletionReporter::new(self.completions_tx.clone(), coord, request_id);

        self.runtime.spawn(async move {
            let result =
                match tokio::time::timeout(timeout, fetcher.fetch_tile(&url, credentials.as_ref()))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(timeout)),
                };
            reporter.send(result);
        });
    }

    /// Requests `coords` in descending priority until the concurrency limit
    /// is reached, skipping tiles already loading.
    ///
    /// Returns how many fetches were issued.
    pub fn request_batch(
        &mut self,
        cache: &mut TileCache,
        config: &HierarchyConfig,
        coords: &[TileCoord],
        priority: impl Fn(&TileCoord) -> f64,
    ) -> usize {
        let mut ranked: Vec<(f64, TileCoord)> = coords.iter().map(|c| (priority(c), *c)).collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut issued = 0;
        for (_, coord) in ranked {
            if !self.has_capacity() {
                break;
            }
            if cache.state(&coord) == TileState::Loading {
                continue;
            }
            if self.request(cache, config, &coord) {
                issued += 1;
            }
        }
        issued
    }

    /// Takes the next finished fetch without waiting.
    pub fn try_next_completion(&mut self) -> Option<FetchCompletion> {
        self.completions_rx.try_recv().ok()
    }

    /// Waits for the next finished fetch.
    ///
    /// Returns `None` if nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<FetchCompletion> {
        if self.in_flight == 0 {
            return None;
        }
        self.completions_rx.recv().await
    }

    /// Applies a finished fetch to the cache.
    ///
    /// The completion is discarded unless its tile is still loading under
    /// the same request id; in that case no texture is registered, so
    /// nothing can leak. A successful root load back-fills a deferred
    /// hierarchy and fires its callback once.
    pub fn apply_completion(
        &mut self,
        completion: FetchCompletion,
        cache: &mut TileCache,
        config: &mut HierarchyConfig,
        registry: &mut dyn TextureRegistry,
    ) -> CompletionOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        let FetchCompletion {
            coord,
            request_id,
            result,
        } = completion;

        if !cache.is_pending(&coord, request_id) {
            debug!(tile = %coord, request_id, "Discarding completion for evicted tile");
            return CompletionOutcome::Discarded;
        }

        match result {
            Ok(image) => {
                let resolved = if coord.is_root() {
                    config.resolve_from_root(image.width, image.height)
                } else {
                    None
                };
                let resolved_extents = resolved.is_some();
                if resolved_extents {
                    info!(
                        width = image.width,
                        height = image.height,
                        "Resolved image extents from root tile"
                    );
                }

                let name = texture_name(&coord, config.level_offset());
                let texture = registry.register_texture(&name, image);
                cache.mark_loaded(&coord, texture);
                debug!(tile = %coord, texture = %texture, "Tile loaded");

                if let Some(resolved) = resolved {
                    resolved.notify();
                }
                CompletionOutcome::Loaded { resolved_extents }
            }
            Err(error) => {
                let failures = cache.get(&coord).map_or(0, |e| e.failures()) + 1;
                let retry_after = if error.is_transient() {
                    self.policy
                        .retry
                        .delay_after(failures)
                        .map(|delay| Instant::now() + delay)
                } else {
                    None
                };
                let will_retry = retry_after.is_some();
                cache.mark_failed(&coord, retry_after);
                warn!(tile = %coord, error = %error, failures, will_retry, "Tile fetch failed");
                CompletionOutcome::Failed { will_retry }
            }
        }
    }
}

/// Sends exactly one completion per issued request.
///
/// If the fetch task panics or is dropped by its runtime before reporting,
/// the drop sends a [`FetchError::Cancelled`] completion so the request's
/// concurrency slot is freed and the tile can be fetched again.
struct CompletionReporter {
    tx: mpsc::UnboundedSender<FetchCompletion>,
    coord: TileCoord,
    request_id: u64,
    sent: bool,
}

impl CompletionReporter {
    fn new(tx: mpsc::UnboundedSender<FetchCompletion>, coord: TileCoord, request_id: u64) -> Self {
        Self {
            tx,
            coord,
            request_id,
            sent: false,
        }
    }

    fn send(&mut self, result: Result<RawImage, FetchError>) {
        self.sent = true;
        // Receiver dropped means the streamer is gone; nothing to report to
        let _ = self.tx.send(FetchCompletion {
            coord: self.coord,
            request_id: self.request_id,
            result,
        });
    }
}

impl Drop for CompletionReporter {
    fn drop(&mut self) {
        if !self.sent {
            warn!(tile = %self.coord, request_id = self.request_id, "Fetch task ended without a result");
            self.send(Err(FetchError::Cancelled));
        }
    }
}

/// Texture name for a tile: `tile:{z}:{x}:{y}`.
pub fn texture_name(coord: &TileCoord, level_offset: i32) -> String {
    format!(
        "tile:{}:{}:{}",
        coord.level as i64 + level_offset as i64,
        coord.x,
        coord.y
    )
}
