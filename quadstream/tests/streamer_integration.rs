//! End-to-end streaming tests against in-process tile sources.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use glam::DVec3;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

use quadstream::cache::{TileCache, TileState};
use quadstream::config::StreamConfig;
use quadstream::coord::TileCoord;
use quadstream::hierarchy::HierarchyConfig;
use quadstream::provider::{AsyncHttpClient, Credentials, FetchError, HttpTileFetcher, TileFetcher};
use quadstream::refine::ViewParams;
use quadstream::scheduler::{CompletionOutcome, FetchPolicy, RequestScheduler};
use quadstream::streamer::TileStreamer;
use quadstream::texture::{HeadlessTextureRegistry, RawImage};

/// Holds every fetch until the test releases a permit.
struct GatedFetcher {
    gate: Arc<Semaphore>,
    tile_size: u32,
}

impl GatedFetcher {
    fn new(tile_size: u32) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                gate: Arc::clone(&gate),
                tile_size,
            },
            gate,
        )
    }
}

impl TileFetcher for GatedFetcher {
    async fn fetch_tile(
        &self,
        _url: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<RawImage, FetchError> {
        self.gate
            .acquire()
            .await
            .map_err(|_| FetchError::Cancelled)?
            .forget();
        Ok(RawImage::blank(self.tile_size, self.tile_size))
    }
}

/// Serves PNG tiles for `/{z}/{x}/{y}` URLs and records what was asked.
struct PngTileServer {
    tile_size: u32,
    requests: Mutex<Vec<String>>,
    tokens: Mutex<HashSet<String>>,
}

impl PngTileServer {
    fn new(tile_size: u32) -> Self {
        Self {
            tile_size,
            requests: Mutex::new(Vec::new()),
            tokens: Mutex::new(HashSet::new()),
        }
    }
}

impl AsyncHttpClient for PngTileServer {
    async fn get(&self, url: &str, credentials: Option<&Credentials>) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        if let Some(credentials) = credentials {
            self.tokens
                .lock()
                .unwrap()
                .insert(credentials.session_id().to_string());
        }
        if url.contains("/missing/") {
            return Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            });
        }

        let image = image::RgbaImage::from_pixel(
            self.tile_size,
            self.tile_size,
            image::Rgba([40, 90, 160, 255]),
        );
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, image::ImageFormat::Png)
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(bytes.into_inner())
    }
}

fn view_above(x: f64, y: f64, height: f64) -> ViewParams {
    ViewParams::look_at(
        DVec3::new(x, y, height),
        DVec3::new(x, y, 0.0),
        60f64.to_radians(),
        1280.0,
        720.0,
    )
}

#[tokio::test]
async fn test_completion_after_eviction_registers_nothing() {
    let (fetcher, gate) = GatedFetcher::new(256);
    let mut scheduler = RequestScheduler::new(
        Arc::new(fetcher),
        Handle::current(),
        5,
        FetchPolicy::default(),
        None,
    );
    let mut cache = TileCache::new(8);
    let mut hierarchy = HierarchyConfig::explicit("mem://{z}/{x}/{y}", 256, None, 1024, 1024).unwrap();
    let mut registry = HeadlessTextureRegistry::new();
    let tile = TileCoord::new(1, 1, 0);

    assert!(scheduler.request(&mut cache, &hierarchy, &tile));
    assert!(cache.dispose(&tile, &mut registry));

    gate.add_permits(1);
    let completion = scheduler.next_completion().await.unwrap();
    let outcome = scheduler.apply_completion(completion, &mut cache, &mut hierarchy, &mut registry);

    assert_eq!(outcome, CompletionOutcome::Discarded);
    assert_eq!(cache.state(&tile), TileState::Missing);
    assert!(cache.get(&tile).is_none());
    assert_eq!(registry.registered(), 0);
    assert_eq!(registry.live_count(), 0);

    // The tile can be requested afresh
    assert!(scheduler.request(&mut cache, &hierarchy, &tile));
}

#[tokio::test]
async fn test_streamer_discards_fetches_for_evicted_tiles() {
    let (fetcher, gate) = GatedFetcher::new(256);
    let hierarchy = HierarchyConfig::explicit("mem://{z}/{x}/{y}", 256, Some(3), 2048, 2048).unwrap();
    let config = StreamConfig::default().with_cache_capacity(2);
    let mut streamer = TileStreamer::new(
        hierarchy,
        config,
        Arc::new(fetcher),
        HeadlessTextureRegistry::new(),
        Handle::current(),
    )
    .unwrap();

    gate.add_permits(1);
    while streamer.wait_for_completion().await {}
    assert!(streamer.is_ready());

    // Close up: the four level-1 tiles are requested
    streamer.update(&view_above(0.5, 0.5, 0.1));
    assert_eq!(streamer.in_flight(), 4);

    // Far away: the waiting tiles are stale and get evicted while loading
    streamer.update(&view_above(0.5, 0.5, 50.0));
    assert!(streamer.cache().len() <= 2);
    assert!(streamer.snapshot().tiles_evicted >= 3);

    gate.add_permits(4);
    while streamer.wait_for_completion().await {}

    let snapshot = streamer.snapshot();
    assert!(snapshot.completions_discarded >= 3);
    // Only applied completions register textures
    assert_eq!(snapshot.textures_registered, snapshot.tiles_loaded);

    // Every loaded entry points at a live texture
    for entry in streamer.cache().iter().filter(|e| e.is_loaded()) {
        let texture = entry.texture().unwrap();
        assert!(streamer.registry().is_live(texture));
    }

    streamer.teardown();
    let snapshot = streamer.snapshot();
    assert_eq!(snapshot.textures_registered, snapshot.textures_released);
    assert_eq!(streamer.registry().double_releases(), 0);
}

#[tokio::test]
async fn test_fly_in_over_http_fetcher() {
    let server = PngTileServer::new(256);
    let fetcher = Arc::new(HttpTileFetcher::new(server));
    let hierarchy = HierarchyConfig::builder("https://tiles.test/{z}/{x}/{y}.png")
        .tile_size(256)
        .dimensions(3000, 2000)
        .level_offset(10)
        .session_id("secret-session")
        .build()
        .unwrap();
    let max_level = hierarchy.max_level();
    let extents = hierarchy.extents().unwrap();

    let mut streamer = TileStreamer::new(
        hierarchy,
        StreamConfig::default().with_cache_capacity(64),
        fetcher,
        HeadlessTextureRegistry::new(),
        Handle::current(),
    )
    .unwrap();

    let target = (0.3, 0.8);
    let mut deepest = 0;
    for step in 0..40 {
        let height = 2.0 * 0.85f64.powi(step);
        while streamer.wait_for_completion().await {}
        let frame = streamer.update(&view_above(target.0, target.1, height));

        if streamer.is_ready() {
            assert!(!frame.is_empty());
            // No holes: the quads cover exactly the image footprint
            let covered: f64 = frame
                .commands
                .iter()
                .map(|c| c.scale.x as f64 * c.scale.y as f64)
                .sum();
            let footprint = extents.quad_width() * extents.quad_height();
            assert!((covered - footprint).abs() < 1e-4, "step {}", step);
        }
        deepest = deepest.max(
            frame
                .commands
                .iter()
                .filter(|c| !c.fallback)
                .map(|c| c.tile.level)
                .max()
                .unwrap_or(0),
        );
    }

    assert_eq!(deepest, max_level);
    let snapshot = streamer.snapshot();
    assert!(snapshot.tiles_loaded > 10);
    assert_eq!(snapshot.fetch_failures, 0);

    let http = streamer.fetcher().http_client();
    let requests = http.requests.lock().unwrap().clone();
    assert_eq!(requests[0], "https://tiles.test/10/0/0.png");
    assert!(requests.iter().all(|url| url.starts_with("https://tiles.test/1")));
    assert!(http.tokens.lock().unwrap().contains("secret-session"));

    streamer.teardown();
    assert_eq!(streamer.registry().live_count(), 0);
}

#[tokio::test]
async fn test_missing_tiles_are_not_retried() {
    let fetcher = Arc::new(HttpTileFetcher::new(PngTileServer::new(64)));
    let hierarchy = HierarchyConfig::explicit("https://tiles.test/missing/{z}/{x}/{y}", 64, None, 64, 64)
        .unwrap();
    let mut streamer = TileStreamer::new(
        hierarchy,
        StreamConfig::default(),
        fetcher,
        HeadlessTextureRegistry::new(),
        Handle::current(),
    )
    .unwrap();

    for _ in 0..5 {
        while streamer.wait_for_completion().await {}
        let frame = streamer.update(&view_above(0.5, 0.5, 1.0));
        assert!(frame.is_empty());
    }

    // 404 is permanent: one attempt, then the root is given up on
    let requests = streamer.fetcher().http_client().requests.lock().unwrap().len();
    assert_eq!(requests, 1);
    assert!(streamer.cache().get(&TileCoord::ROOT).unwrap().is_exhausted());
}
