//! Tile request scheduling.
//!
//! [`RequestScheduler`] turns "this tile is needed" into at most one
//! asynchronous fetch per tile, never more than `K` at once, issued in
//! priority order. Results come back as [`FetchCompletion`]s over a channel
//! and are applied to the cache by the owning thread, which checks the
//! request id so a completion for an evicted or re-requested tile is
//! dropped without registering a texture.
//!
//! [`FetchPolicy`] adds a per-fetch timeout and a [`RetryPolicy`] for
//! failed tiles.

mod policy;
mod request;

pub use policy::{
    FetchPolicy, RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_SECS,
};
pub use request::{
    texture_name, CompletionOutcome, FetchCompletion, RequestScheduler,
    DEFAULT_MAX_CONCURRENT_REQUESTS,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::runtime::Handle;

    use crate::cache::{TileCache, TileState};
    use crate::coord::TileCoord;
    use crate::hierarchy::HierarchyConfig;
    use crate::provider::mock::MockTileFetcher;
    use crate::provider::{Credentials, FetchError, TileFetcher};
    use crate::texture::{HeadlessTextureRegistry, RawImage};

    const URL: &str = "mem://{z}/{x}/{y}";

    fn config() -> HierarchyConfig {
        HierarchyConfig::explicit(URL, 256, Some(3), 2048, 2048).unwrap()
    }

    fn scheduler(
        fetcher: MockTileFetcher,
        max_concurrent: usize,
        policy: FetchPolicy,
    ) -> RequestScheduler<MockTileFetcher> {
        RequestScheduler::new(
            Arc::new(fetcher),
            Handle::current(),
            max_concurrent,
            policy,
            None,
        )
    }

    #[tokio::test]
    async fn test_duplicate_request_issues_one_fetch() {
        let (fetcher, gate) = MockTileFetcher::gated(256);
        let mut sched = scheduler(fetcher, 5, FetchPolicy::default());
        let mut cache = TileCache::new(16);
        let mut config = config();
        let mut registry = HeadlessTextureRegistry::new();

        assert!(sched.request(&mut cache, &config, &TileCoord::ROOT));
        assert!(!sched.request(&mut cache, &config, &TileCoord::ROOT));
        assert_eq!(cache.state(&TileCoord::ROOT), TileState::Loading);
        assert_eq!(sched.in_flight(), 1);

        gate.add_permits(1);
        let completion = sched.next_completion().await.unwrap();
        let outcome = sched.apply_completion(completion, &mut cache, &mut config, &mut registry);

        assert_eq!(
            outcome,
            CompletionOutcome::Loaded {
                resolved_extents: false
            }
        );
        assert_eq!(sched.fetcher().call_count("mem://0/0/0"), 1);
        assert!(cache.is_loaded(&TileCoord::ROOT));
        assert_eq!(sched.in_flight(), 0);

        // Loaded tiles are never fetched again
        assert!(!sched.request(&mut cache, &config, &TileCoord::ROOT));
    }

    #[tokio::test]
    async fn test_batch_respects_concurrency_limit() {
        let (fetcher, _gate) = MockTileFetcher::gated(256);
        let mut sched = scheduler(fetcher, 3, FetchPolicy::default());
        let mut cache = TileCache::new(64);
        let config = config();

        let tiles: Vec<_> = (0..8).map(|x| TileCoord::new(3, x, 0)).collect();
        let issued = sched.request_batch(&mut cache, &config, &tiles, |_| 1.0);

        assert_eq!(issued, 3);
        assert_eq!(sched.in_flight(), 3);
        assert_eq!(cache.loading_count(), 3);
        assert!(!sched.has_capacity());

        // A second batch adds nothing while the first is still in flight
        assert_eq!(sched.request_batch(&mut cache, &config, &tiles, |_| 1.0), 0);
    }

    #[tokio::test]
    async fn test_batch_issues_highest_priority_first() {
        let (fetcher, _gate) = MockTileFetcher::gated(256);
        let mut sched = scheduler(fetcher, 2, FetchPolicy::default());
        let mut cache = TileCache::new(64);
        let config = config();

        let tiles: Vec<_> = (0..5).map(|x| TileCoord::new(3, x, 0)).collect();
        let issued = sched.request_batch(&mut cache, &config, &tiles, |c| c.x as f64);

        assert_eq!(issued, 2);
        assert_eq!(cache.state(&TileCoord::new(3, 4, 0)), TileState::Loading);
        assert_eq!(cache.state(&TileCoord::new(3, 3, 0)), TileState::Loading);
        assert_eq!(cache.state(&TileCoord::new(3, 0, 0)), TileState::Missing);
    }

    #[tokio::test]
    async fn test_completion_for_evicted_tile_is_discarded() {
        let (fetcher, gate) = MockTileFetcher::gated(256);
        let mut sched = scheduler(fetcher, 5, FetchPolicy::default());
        let mut cache = TileCache::new(16);
        let mut config = config();
        let mut registry = HeadlessTextureRegistry::new();
        let tile = TileCoord::new(2, 1, 1);

        assert!(sched.request(&mut cache, &config, &tile));
        assert!(cache.dispose(&tile, &mut registry));

        gate.add_permits(1);
        let completion = sched.next_completion().await.unwrap();
        let outcome = sched.apply_completion(completion, &mut cache, &mut config, &mut registry);

        assert_eq!(outcome, CompletionOutcome::Discarded);
        assert!(cache.get(&tile).is_none());
        assert_eq!(registry.registered(), 0);
        assert_eq!(sched.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_stale_request_id_is_discarded() {
        let mut sched = scheduler(MockTileFetcher::immediate(256), 5, FetchPolicy::default());
        let mut cache = TileCache::new(16);
        let mut config = config();
        let mut registry = HeadlessTextureRegistry::new();
        let tile = TileCoord::new(1, 0, 0);

        cache.ensure(&tile);
        cache.mark_loading(&tile, 42);
        let stale = FetchCompletion {
            coord: tile,
            request_id: 7,
            result: Ok(RawImage::blank(4, 4)),
        };
        let outcome = sched.apply_completion(stale, &mut cache, &mut config, &mut registry);

        assert_eq!(outcome, CompletionOutcome::Discarded);
        assert!(cache.is_pending(&tile, 42));
        assert_eq!(registry.registered(), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_backs_off() {
        let fetcher = MockTileFetcher::immediate(256);
        fetcher.fail("mem://1/0/0", FetchError::Http("connection reset".into()));
        let policy = FetchPolicy::default().with_retry(RetryPolicy::fixed(3, Duration::from_secs(60)));
        let mut sched = scheduler(fetcher, 5, policy);
        let mut cache = TileCache::new(16);
        let mut config = config();
        let mut registry = HeadlessTextureRegistry::new();
        let tile = TileCoord::new(1, 0, 0);

        assert!(sched.request(&mut cache, &config, &tile));
        let completion = sched.next_completion().await.unwrap();
        let outcome = sched.apply_completion(completion, &mut cache, &mut config, &mut registry);

        assert_eq!(outcome, CompletionOutcome::Failed { will_retry: true });
        assert_eq!(cache.state(&tile), TileState::Missing);
        assert_eq!(cache.get(&tile).unwrap().failures(), 1);
        // Still inside the retry delay
        assert!(!sched.request(&mut cache, &config, &tile));
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let fetcher = MockTileFetcher::immediate(256);
        fetcher.fail("mem://0/0/0", FetchError::Decode("not an image".into()));
        let mut sched = scheduler(fetcher, 5, FetchPolicy::default());
        let mut cache = TileCache::new(16);
        let mut config = config();
        let mut registry = HeadlessTextureRegistry::new();

        sched.request(&mut cache, &config, &TileCoord::ROOT);
        let completion = sched.next_completion().await.unwrap();
        let outcome = sched.apply_completion(completion, &mut cache, &mut config, &mut registry);

        assert_eq!(outcome, CompletionOutcome::Failed { will_retry: false });
        assert!(cache.get(&TileCoord::ROOT).unwrap().is_exhausted());
        assert!(!sched.request(&mut cache, &config, &TileCoord::ROOT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_times_out() {
        let (fetcher, _gate) = MockTileFetcher::gated(256);
        let policy = FetchPolicy::default().with_timeout(Duration::from_millis(100));
        let mut sched = scheduler(fetcher, 5, policy);
        let mut cache = TileCache::new(16);
        let config = config();

        sched.request(&mut cache, &config, &TileCoord::ROOT);
        let completion = sched.next_completion().await.unwrap();

        assert!(matches!(completion.result, Err(FetchError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_deferred_root_resolves_and_notifies() {
        let fetcher = MockTileFetcher::immediate(256).with_size("mem://0/0/0", 640, 480);
        let mut sched = scheduler(fetcher, 5, FetchPolicy::default());
        let mut cache = TileCache::new(16);
        let mut registry = HeadlessTextureRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut config = HierarchyConfig::deferred(URL).with_on_root_loaded(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sched.request(&mut cache, &config, &TileCoord::ROOT);
        let completion = sched.next_completion().await.unwrap();
        let outcome = sched.apply_completion(completion, &mut cache, &mut config, &mut registry);

        assert_eq!(
            outcome,
            CompletionOutcome::Loaded {
                resolved_extents: true
            }
        );
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(config.valid());
        assert_eq!(config.tile_size(), Some(640));
        assert_eq!(config.tex_height(), Some(480));
    }

    #[tokio::test]
    async fn test_texture_named_after_tile() {
        let mut sched = scheduler(MockTileFetcher::immediate(8), 5, FetchPolicy::default());
        let mut cache = TileCache::new(16);
        let mut config = config().with_level_offset(10);
        let mut registry = HeadlessTextureRegistry::new();
        let tile = TileCoord::new(2, 3, 1);

        sched.request(&mut cache, &config, &tile);
        let completion = sched.next_completion().await.unwrap();
        sched.apply_completion(completion, &mut cache, &mut config, &mut registry);

        let handle = cache.get(&tile).unwrap().texture().unwrap();
        assert_eq!(registry.name_of(handle), Some("tile:12:3:1"));
        assert_eq!(sched.fetcher().calls(), vec!["mem://12/3/1".to_string()]);
    }

    #[tokio::test]
    async fn test_next_completion_with_nothing_in_flight() {
        let mut sched = scheduler(MockTileFetcher::immediate(8), 5, FetchPolicy::default());
        assert!(sched.next_completion().await.is_none());
        assert!(sched.try_next_completion().is_none());
    }

    struct PanickingFetcher;

    impl TileFetcher for PanickingFetcher {
        async fn fetch_tile(
            &self,
            url: &str,
            _credentials: Option<&Credentials>,
        ) -> Result<RawImage, FetchError> {
            panic!("fetcher crashed on {}", url)
        }
    }

    #[tokio::test]
    async fn test_panicking_fetch_frees_its_slot() {
        let mut sched = RequestScheduler::new(
            Arc::new(PanickingFetcher),
            Handle::current(),
            1,
            FetchPolicy::default().with_timeout(Duration::from_millis(50)),
            None,
        );
        let mut cache = TileCache::new(16);
        let mut config = config();
        let mut registry = HeadlessTextureRegistry::new();
        let tile = TileCoord::new(1, 0, 0);

        assert!(sched.request(&mut cache, &config, &tile));
        assert!(!sched.has_capacity());

        let completion = sched.next_completion().await.unwrap();
        assert!(matches!(completion.result, Err(FetchError::Cancelled)));
        let outcome = sched.apply_completion(completion, &mut cache, &mut config, &mut registry);

        assert_eq!(outcome, CompletionOutcome::Failed { will_retry: true });
        assert_eq!(sched.in_flight(), 0);
        assert_eq!(cache.state(&tile), TileState::Missing);
        assert_eq!(registry.registered(), 0);
        assert!(sched.request(&mut cache, &config, &TileCoord::new(1, 1, 0)));
    }
}
