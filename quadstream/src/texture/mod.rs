//! GPU resource collaborator.
//!
//! The streamer never talks to a graphics API directly. Decoded tiles are
//! handed to a [`TextureRegistry`], which returns an opaque
//! [`TextureHandle`]; the handle is released through the same registry when
//! the tile is evicted or the streamer is torn down.
//!
//! [`HeadlessTextureRegistry`] keeps textures in memory and counts
//! registrations and releases. It backs the CLI simulator and the tests.

use std::collections::HashMap;
use std::fmt;

use tracing::warn;

/// Decoded tile pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct RawImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA8 pixels, row-major from the top row
    pub pixels: Vec<u8>,
}

impl RawImage {
    /// Creates an image from RGBA8 pixels.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Creates a fully transparent image.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(width, height, vec![0; width as usize * height as usize * 4])
    }

    /// Size of the pixel buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

impl fmt::Debug for RawImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Opaque reference to a registered texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

impl fmt::Display for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// Uploads tile images and releases them again.
///
/// Implementations wrap whatever rendering engine hosts the scene. Both
/// methods are called on the thread that owns the streamer.
pub trait TextureRegistry {
    /// Registers `image` under a human-readable `name` and returns its handle.
    fn register_texture(&mut self, name: &str, image: RawImage) -> TextureHandle;

    /// Releases a handle previously returned by `register_texture`.
    fn release_texture(&mut self, handle: TextureHandle);
}

impl<T: TextureRegistry + ?Sized> TextureRegistry for Box<T> {
    fn register_texture(&mut self, name: &str, image: RawImage) -> TextureHandle {
        (**self).register_texture(name, image)
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        (**self).release_texture(handle)
    }
}

/// In-memory texture registry with no GPU behind it.
#[derive(Debug, Default)]
pub struct HeadlessTextureRegistry {
    next_handle: u64,
    live: HashMap<TextureHandle, (String, RawImage)>,
    registered: u64,
    released: u64,
    double_releases: u64,
}

impl HeadlessTextureRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of textures currently held.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Returns true if `handle` is registered and not yet released.
    pub fn is_live(&self, handle: TextureHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Name a live texture was registered under.
    pub fn name_of(&self, handle: TextureHandle) -> Option<&str> {
        self.live.get(&handle).map(|(name, _)| name.as_str())
    }

    /// Total registrations since creation.
    pub fn registered(&self) -> u64 {
        self.registered
    }

    /// Total successful releases since creation.
    pub fn released(&self) -> u64 {
        self.released
    }

    /// Releases of handles that were not live.
    pub fn double_releases(&self) -> u64 {
        self.double_releases
    }

    /// Bytes of pixel data currently held.
    pub fn resident_bytes(&self) -> usize {
        self.live.values().map(|(_, image)| image.byte_len()).sum()
    }
}

impl TextureRegistry for HeadlessTextureRegistry {
    fn register_texture(&mut self, name: &str, image: RawImage) -> TextureHandle {
        self.next_handle += 1;
        let handle = TextureHandle(self.next_handle);
        self.live.insert(handle, (name.to_string(), image));
        self.registered += 1;
        handle
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        if self.live.remove(&handle).is_some() {
            self.released += 1;
        } else {
            warn!(handle = %handle, "Release of unknown texture");
            self.double_releases += 1;
        }
    }
}
