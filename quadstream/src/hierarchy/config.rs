//! Hierarchy configuration.

use std::fmt;

use super::error::ConfigError;
use super::extents::Extents;
use crate::coord::{TileCoord, MAX_LEVEL};

/// Callback fired once, when the root tile of a deferred-extents hierarchy
/// has loaded and its dimensions are known.
pub type RootLoadedCallback = Box<dyn FnOnce() + Send>;

/// Geometric and resolution description of an image pyramid.
///
/// Built in one of two modes:
///
/// - **Explicit**: tile size and image dimensions are known upfront
///   ([`HierarchyConfig::explicit`]).
/// - **Deferred**: a single image whose size is learned from the root tile
///   itself ([`HierarchyConfig::deferred`]). Tile size and dimensions stay
///   unknown until [`resolve_from_root`](Self::resolve_from_root) back-fills
///   them.
pub struct HierarchyConfig {
    url_pattern: String,
    tile_size: Option<u32>,
    max_level: u8,
    tex_width: Option<u32>,
    tex_height: Option<u32>,
    level_offset: i32,
    session_id: Option<String>,
    on_root_loaded: Option<RootLoadedCallback>,
}

impl HierarchyConfig {
    /// Creates an explicit-extents configuration.
    ///
    /// When `max_level` is `None` the depth is derived from the image size.
    /// When it is shallower than the derived depth, the image dimensions are
    /// scaled down by the same power of two so the pyramid still has a single
    /// root tile.
    ///
    /// # Example
    ///
    /// ```
    /// use quadstream::hierarchy::HierarchyConfig;
    ///
    /// let config = HierarchyConfig::explicit("https://tiles/{z}/{x}/{y}.jpg", 256, Some(2), 1024, 768)?;
    /// let extents = config.extents().unwrap();
    /// assert_eq!(extents.root_tile_size(), 1024);
    /// assert_eq!(extents.quad_height(), 0.75);
    /// # Ok::<(), quadstream::hierarchy::ConfigError>(())
    /// ```
    pub fn explicit(
        url_pattern: impl Into<String>,
        tile_size: u32,
        max_level: Option<u8>,
        tex_width: u32,
        tex_height: u32,
    ) -> Result<Self, ConfigError> {
        let url_pattern = url_pattern.into();
        if url_pattern.is_empty() {
            return Err(ConfigError::EmptyUrlPattern);
        }
        if tile_size == 0 {
            return Err(ConfigError::NonPositive("tile_size"));
        }
        if tex_width == 0 {
            return Err(ConfigError::NonPositive("tex_width"));
        }
        if tex_height == 0 {
            return Err(ConfigError::NonPositive("tex_height"));
        }

        let implied = implied_level(tile_size, tex_width.max(tex_height));
        let (max_level, tex_width, tex_height) = match max_level {
            Some(level) if (level as u32) < implied => {
                let shift = implied - level as u32;
                (
                    level,
                    downscale(tex_width, shift),
                    downscale(tex_height, shift),
                )
            }
            Some(level) => (level, tex_width, tex_height),
            None => {
                if implied > MAX_LEVEL as u32 {
                    return Err(ConfigError::TooDeep(implied));
                }
                (implied as u8, tex_width, tex_height)
            }
        };
        if max_level > MAX_LEVEL {
            return Err(ConfigError::TooDeep(max_level as u32));
        }

        Ok(Self {
            url_pattern,
            tile_size: Some(tile_size),
            max_level,
            tex_width: Some(tex_width),
            tex_height: Some(tex_height),
            level_offset: 0,
            session_id: None,
            on_root_loaded: None,
        })
    }

    /// Creates a deferred-extents configuration for a single image.
    ///
    /// The pyramid has one level; its size is set from the root tile once it
    /// loads.
    pub fn deferred(url_pattern: impl Into<String>) -> Self {
        Self {
            url_pattern: url_pattern.into(),
            tile_size: None,
            max_level: 0,
            tex_width: None,
            tex_height: None,
            level_offset: 0,
            session_id: None,
            on_root_loaded: None,
        }
    }

    /// Starts a builder.
    pub fn builder(url_pattern: impl Into<String>) -> HierarchyConfigBuilder {
        HierarchyConfigBuilder::new(url_pattern)
    }

    /// Sets the offset added to the level when resolving `{z}`.
    pub fn with_level_offset(mut self, offset: i32) -> Self {
        self.level_offset = offset;
        self
    }

    /// Sets the opaque credential forwarded to the fetcher.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the callback fired when a deferred root resolves.
    pub fn with_on_root_loaded(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_root_loaded = Some(Box::new(callback));
        self
    }

    /// The URL template.
    pub fn url_pattern(&self) -> &str {
        &self.url_pattern
    }

    /// Tile edge length in pixels, if known.
    pub fn tile_size(&self) -> Option<u32> {
        self.tile_size
    }

    /// Deepest pyramid level.
    pub fn max_level(&self) -> u8 {
        self.max_level
    }

    /// Image width in pixels, if known.
    pub fn tex_width(&self) -> Option<u32> {
        self.tex_width
    }

    /// Image height in pixels, if known.
    pub fn tex_height(&self) -> Option<u32> {
        self.tex_height
    }

    /// Offset added to the level in `{z}`.
    pub fn level_offset(&self) -> i32 {
        self.level_offset
    }

    /// Credential forwarded with every fetch.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns true while the image size is still unknown.
    pub fn is_deferred(&self) -> bool {
        self.tile_size.is_none() || self.tex_width.is_none() || self.tex_height.is_none()
    }

    /// Returns true if every field is present and positive.
    ///
    /// A deferred configuration is not valid until its root has resolved.
    pub fn valid(&self) -> bool {
        !self.url_pattern.is_empty()
            && self.tile_size.is_some_and(|v| v > 0)
            && self.tex_width.is_some_and(|v| v > 0)
            && self.tex_height.is_some_and(|v| v > 0)
            && self.max_level <= MAX_LEVEL
    }

    /// Checks the configuration can start a streamer.
    ///
    /// Unlike [`valid`](Self::valid) this accepts a deferred configuration,
    /// since its missing fields are filled in by the root tile.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url_pattern.is_empty() {
            return Err(ConfigError::EmptyUrlPattern);
        }
        if self.max_level > MAX_LEVEL {
            return Err(ConfigError::TooDeep(self.max_level as u32));
        }
        let fields = [
            ("tile_size", self.tile_size),
            ("tex_width", self.tex_width),
            ("tex_height", self.tex_height),
        ];
        if fields.iter().all(|(_, v)| v.is_none()) {
            return Ok(());
        }
        for (name, value) in fields {
            match value {
                None => return Err(ConfigError::Missing(name)),
                Some(0) => return Err(ConfigError::NonPositive(name)),
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Resolved geometry, or `None` while deferred.
    pub fn extents(&self) -> Option<Extents> {
        Some(Extents {
            tile_size: self.tile_size?,
            max_level: self.max_level,
            width: self.tex_width?,
            height: self.tex_height?,
        })
    }

    /// Back-fills a deferred configuration from the root tile's pixel size.
    ///
    /// Returns the root-loaded callback on the first successful resolution so
    /// the caller can fire it; returns `None` if the configuration was not
    /// deferred or the dimensions are zero.
    pub fn resolve_from_root(&mut self, width: u32, height: u32) -> Option<RootResolved> {
        if !self.is_deferred() || width == 0 || height == 0 {
            return None;
        }
        self.tile_size = Some(width.max(height));
        self.tex_width = Some(width);
        self.tex_height = Some(height);
        self.max_level = 0;
        Some(RootResolved {
            callback: self.on_root_loaded.take(),
        })
    }

    /// Resolves the URL of `tile` by substituting `{x}`, `{y}` and `{z}`.
    ///
    /// `{z}` is the tile level plus the configured level offset.
    pub fn tile_url(&self, tile: &TileCoord) -> String {
        let z = tile.level as i64 + self.level_offset as i64;
        self.url_pattern
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
            .replace("{z}", &z.to_string())
    }
}

impl fmt::Debug for HierarchyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HierarchyConfig")
            .field("url_pattern", &self.url_pattern)
            .field("tile_size", &self.tile_size)
            .field("max_level", &self.max_level)
            .field("tex_width", &self.tex_width)
            .field("tex_height", &self.tex_height)
            .field("level_offset", &self.level_offset)
            .field("session_id", &self.session_id.as_ref().map(|_| "<redacted>"))
            .field("on_root_loaded", &self.on_root_loaded.is_some())
            .finish()
    }
}

/// Outcome of resolving a deferred root.
pub struct RootResolved {
    callback: Option<RootLoadedCallback>,
}

impl RootResolved {
    /// Fires the root-loaded callback, if one was registered.
    pub fn notify(self) {
        if let Some(callback) = self.callback {
            callback();
        }
    }
}

/// Builder for [`HierarchyConfig`].
///
/// Supplying none of tile size, width and height yields a deferred
/// configuration; supplying all three yields an explicit one.
pub struct HierarchyConfigBuilder {
    url_pattern: String,
    tile_size: Option<u32>,
    max_level: Option<u8>,
    tex_width: Option<u32>,
    tex_height: Option<u32>,
    level_offset: i32,
    session_id: Option<String>,
    on_root_loaded: Option<RootLoadedCallback>,
}

impl HierarchyConfigBuilder {
    /// Creates a builder for the given URL template.
    pub fn new(url_pattern: impl Into<String>) -> Self {
        Self {
            url_pattern: url_pattern.into(),
            tile_size: None,
            max_level: None,
            tex_width: None,
            tex_height: None,
            level_offset: 0,
            session_id: None,
            on_root_loaded: None,
        }
    }

    /// Sets the tile edge length in pixels.
    pub fn tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = Some(tile_size);
        self
    }

    /// Caps the pyramid depth.
    pub fn max_level(mut self, max_level: u8) -> Self {
        self.max_level = Some(max_level);
        self
    }

    /// Sets the full-resolution image size.
    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.tex_width = Some(width);
        self.tex_height = Some(height);
        self
    }

    /// Sets the `{z}` level offset.
    pub fn level_offset(mut self, offset: i32) -> Self {
        self.level_offset = offset;
        self
    }

    /// Sets the fetch credential.
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the deferred-root callback.
    pub fn on_root_loaded(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_root_loaded = Some(Box::new(callback));
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<HierarchyConfig, ConfigError> {
        let mut config = match (self.tile_size, self.tex_width, self.tex_height) {
            (None, None, None) => {
                if self.url_pattern.is_empty() {
                    return Err(ConfigError::EmptyUrlPattern);
                }
                HierarchyConfig::deferred(self.url_pattern)
            }
            (Some(tile_size), Some(width), Some(height)) => {
                HierarchyConfig::explicit(self.url_pattern, tile_size, self.max_level, width, height)?
            }
            (None, _, _) => return Err(ConfigError::Missing("tile_size")),
            (_, None, _) => return Err(ConfigError::Missing("tex_width")),
            (_, _, None) => return Err(ConfigError::Missing("tex_height")),
        };
        config.level_offset = self.level_offset;
        config.session_id = self.session_id;
        config.on_root_loaded = self.on_root_loaded;
        Ok(config)
    }
}

/// Smallest level at which `tile_size << level` covers `extent`.
fn implied_level(tile_size: u32, extent: u32) -> u32 {
    let mut level = 0u32;
    let mut covered = tile_size as u64;
    while covered < extent as u64 {
        covered <<= 1;
        level += 1;
    }
    level
}

/// Divides `value` by `2^shift`, rounding up so the result stays positive.
fn downscale(value: u32, shift: u32) -> u32 {
    let divisor = 1u64 << shift.min(63);
    (value as u64).div_ceil(divisor) as u32
}
