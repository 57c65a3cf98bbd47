//! HTTP tile fetcher.
//!
//! Downloads a tile with an [`AsyncHttpClient`] and decodes it with the
//! `image` crate into RGBA8 pixels. Any format `image` recognizes from the
//! payload's magic bytes is accepted (PNG, JPEG, WebP, ...).

use tracing::debug;

use super::http::AsyncHttpClient;
use super::types::{Credentials, FetchError, TileFetcher};
use crate::texture::RawImage;

/// Fetches tiles over HTTP and decodes them.
///
/// # Example
///
/// ```ignore
/// use quadstream::provider::{AsyncReqwestClient, HttpTileFetcher};
///
/// let fetcher = HttpTileFetcher::new(AsyncReqwestClient::new()?);
/// ```
pub struct HttpTileFetcher<C: AsyncHttpClient> {
    http_client: C,
}

impl<C: AsyncHttpClient> HttpTileFetcher<C> {
    /// Creates a fetcher on top of `http_client`.
    pub fn new(http_client: C) -> Self {
        Self { http_client }
    }

    /// The underlying HTTP client.
    pub fn http_client(&self) -> &C {
        &self.http_client
    }
}

impl<C: AsyncHttpClient> TileFetcher for HttpTileFetcher<C> {
    async fn fetch_tile(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<RawImage, FetchError> {
        let bytes = self.http_client.get(url, credentials).await?;
        let image = decode_image(&bytes)?;
        debug!(url, width = image.width, height = image.height, "Tile decoded");
        Ok(image)
    }
}

/// Decodes an encoded image into RGBA8 pixels.
pub fn decode_image(bytes: &[u8]) -> Result<RawImage, FetchError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| FetchError::Decode(e.to_string()))?
        .to_rgba8();
    let (width, height) = decoded.dimensions();
    Ok(RawImage::new(width, height, decoded.into_raw()))
}
