//! Per-tile cache entry.

use std::fmt;
use std::time::Instant;

use crate::coord::TileCoord;
use crate::texture::TextureHandle;

/// Load state of a tile.
///
/// Moves forward only, `Missing → Loading → Loaded`. The one way back is a
/// failed fetch, which returns a `Loading` entry to `Missing` so it can be
/// requested again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileState {
    /// Known but not requested (or a previous request failed).
    Missing,
    /// A fetch is in flight.
    Loading,
    /// Texture registered and ready to draw.
    Loaded,
}

impl fmt::Display for TileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TileState::Missing => "missing",
            TileState::Loading => "loading",
            TileState::Loaded => "loaded",
        };
        f.write_str(s)
    }
}

/// Cache entry for one tile.
#[derive(Debug, Clone)]
pub struct TileInfo {
    coord: TileCoord,
    state: TileState,
    time_stamp: u64,
    texture: Option<TextureHandle>,
    request_id: Option<u64>,
    failures: u32,
    retry_after: Option<Instant>,
    exhausted: bool,
    displayed: bool,
}

impl TileInfo {
    pub(super) fn new(coord: TileCoord, time_stamp: u64) -> Self {
        Self {
            coord,
            state: TileState::Missing,
            time_stamp,
            texture: None,
            request_id: None,
            failures: 0,
            retry_after: None,
            exhausted: false,
            displayed: false,
        }
    }

    /// The tile this entry describes.
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Current load state.
    pub fn state(&self) -> TileState {
        self.state
    }

    /// Recency clock value of the last touch.
    pub fn time_stamp(&self) -> u64 {
        self.time_stamp
    }

    /// Registered texture, once loaded.
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Identifier of the outstanding fetch, while loading.
    pub fn request_id(&self) -> Option<u64> {
        self.request_id
    }

    /// Consecutive failed fetches.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Returns true if the entry is loaded.
    pub fn is_loaded(&self) -> bool {
        self.state == TileState::Loaded
    }

    /// Returns true if the tile has been drawn with its own texture.
    pub fn is_displayed(&self) -> bool {
        self.displayed
    }

    /// Returns true if a new fetch may be issued for this entry at `now`.
    pub fn is_requestable(&self, now: Instant) -> bool {
        self.state == TileState::Missing
            && !self.exhausted
            && self.retry_after.map_or(true, |at| now >= at)
    }

    /// Returns true once retries have been given up.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub(super) fn set_time_stamp(&mut self, time_stamp: u64) {
        self.time_stamp = time_stamp;
    }

    pub(super) fn begin_loading(&mut self, request_id: u64) -> bool {
        if self.state != TileState::Missing {
            return false;
        }
        self.state = TileState::Loading;
        self.request_id = Some(request_id);
        self.retry_after = None;
        true
    }

    pub(super) fn finish_loading(&mut self, texture: TextureHandle, time_stamp: u64) -> bool {
        if self.state != TileState::Loading {
            return false;
        }
        self.state = TileState::Loaded;
        self.texture = Some(texture);
        self.request_id = None;
        self.failures = 0;
        self.time_stamp = time_stamp;
        true
    }

    pub(super) fn fail_loading(&mut self, retry_after: Option<Instant>) -> bool {
        if self.state != TileState::Loading {
            return false;
        }
        self.state = TileState::Missing;
        self.request_id = None;
        self.failures += 1;
        self.exhausted = retry_after.is_none();
        self.retry_after = retry_after;
        true
    }

    pub(super) fn mark_displayed(&mut self) {
        self.displayed = true;
    }

    pub(super) fn take_texture(&mut self) -> Option<TextureHandle> {
        self.texture.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_entry_is_missing() {
        let info = TileInfo::new(TileCoord::new(2, 1, 1), 7);
        assert_eq!(info.state(), TileState::Missing);
        assert_eq!(info.time_stamp(), 7);
        assert!(info.is_requestable(Instant::now()));
        assert!(info.texture().is_none());
    }

    #[test]
    fn test_transitions_only_move_forward() {
        let mut info = TileInfo::new(TileCoord::ROOT, 0);
        // Cannot finish a load that never started
        assert!(!info.finish_loading(TextureHandle(1), 1));

        assert!(info.begin_loading(1));
        assert!(!info.begin_loading(2));
        assert_eq!(info.request_id(), Some(1));

        assert!(info.finish_loading(TextureHandle(1), 3));
        assert_eq!(info.state(), TileState::Loaded);
        assert_eq!(info.time_stamp(), 3);
        assert!(!info.begin_loading(3));
        assert!(!info.fail_loading(None));
    }

    #[test]
    fn test_failure_reverts_to_missing_with_backoff() {
        let now = Instant::now();
        let mut info = TileInfo::new(TileCoord::ROOT, 0);
        info.begin_loading(1);
        assert!(info.fail_loading(Some(now + Duration::from_secs(5))));

        assert_eq!(info.state(), TileState::Missing);
        assert_eq!(info.failures(), 1);
        assert!(!info.is_requestable(now));
        assert!(info.is_requestable(now + Duration::from_secs(5)));
    }

    #[test]
    fn test_failure_without_retry_exhausts() {
        let mut info = TileInfo::new(TileCoord::ROOT, 0);
        info.begin_loading(1);
        info.fail_loading(None);
        assert!(info.is_exhausted());
        assert!(!info.is_requestable(Instant::now()));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(TileState::Loading.to_string(), "loading");
    }
}
