//! Tile fetch collaborator
//!
//! This module provides the [`TileFetcher`] trait the scheduler uses to load
//! tiles, and an HTTP implementation that downloads and decodes them.
//!
//! ```ignore
//! use quadstream::provider::{AsyncReqwestClient, HttpTileFetcher};
//!
//! let http_client = AsyncReqwestClient::new()?;
//! let fetcher = HttpTileFetcher::new(http_client);
//! ```

mod fetcher;
mod http;
mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use fetcher::{decode_image, HttpTileFetcher};
pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_HTTP_TIMEOUT_SECS};
pub use types::{Credentials, FetchError, TileFetcher};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
