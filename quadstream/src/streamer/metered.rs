//! Texture registry wrapper that counts uploads and releases.

use crate::telemetry::StreamMetrics;
use crate::texture::{RawImage, TextureHandle, TextureRegistry};

pub(super) struct MeteredRegistry<'a, R: TextureRegistry> {
    inner: &'a mut R,
    metrics: &'a StreamMetrics,
}

impl<'a, R: TextureRegistry> MeteredRegistry<'a, R> {
    pub(super) fn new(inner: &'a mut R, metrics: &'a StreamMetrics) -> Self {
        Self { inner, metrics }
    }
}

impl<R: TextureRegistry> TextureRegistry for MeteredRegistry<'_, R> {
    fn register_texture(&mut self, name: &str, image: RawImage) -> TextureHandle {
        self.metrics.texture_registered();
        self.inner.register_texture(name, image)
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        self.metrics.texture_released();
        self.inner.release_texture(handle);
    }
}
