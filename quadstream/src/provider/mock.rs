//! Scriptable fetcher for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use super::types::{Credentials, FetchError, TileFetcher};
use crate::texture::RawImage;

/// Fetcher that returns blank images, optionally held back by a gate.
///
/// Every call is recorded. When gated, a fetch waits for one permit before
/// completing, so tests decide exactly when completions happen.
pub struct MockTileFetcher {
    calls: Mutex<Vec<String>>,
    sizes: Mutex<HashMap<String, (u32, u32)>>,
    failures: Mutex<HashMap<String, FetchError>>,
    default_size: (u32, u32),
    gate: Option<Arc<Semaphore>>,
}

impl MockTileFetcher {
    /// Completes every fetch immediately with a `size × size` image.
    pub fn immediate(size: u32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            sizes: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            default_size: (size, size),
            gate: None,
        }
    }

    /// Holds every fetch until a permit is added to the returned semaphore.
    pub fn gated(size: u32) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let mut fetcher = Self::immediate(size);
        fetcher.gate = Some(Arc::clone(&gate));
        (fetcher, gate)
    }

    /// Overrides the image size returned for `url`.
    pub fn with_size(self, url: &str, width: u32, height: u32) -> Self {
        self.sizes
            .lock()
            .unwrap()
            .insert(url.to_string(), (width, height));
        self
    }

    /// Makes fetches of `url` fail with `error`.
    pub fn fail(&self, url: &str, error: FetchError) {
        self.failures
            .lock()
            .unwrap()
            .insert(url.to_string(), error);
    }

    /// Stops failing `url`.
    pub fn heal(&self, url: &str) {
        self.failures.lock().unwrap().remove(url);
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of fetches of `url`.
    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

impl TileFetcher for MockTileFetcher {
    async fn fetch_tile(
        &self,
        url: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<RawImage, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| FetchError::Cancelled)?
                .forget();
        }

        let failure = self.failures.lock().unwrap().get(url).cloned();
        if let Some(error) = failure {
            return Err(error);
        }
        let size = self.sizes.lock().unwrap().get(url).copied();
        let (width, height) = size.unwrap_or(self.default_size);
        Ok(RawImage::blank(width, height))
    }
}
