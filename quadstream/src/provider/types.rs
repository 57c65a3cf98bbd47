//! Fetch collaborator types.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::texture::RawImage;

/// Errors a tile fetch can end with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport-level failure (connection refused, reset, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The payload could not be decoded as an image.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The fetch did not finish within the configured timeout.
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The fetch task was dropped before it produced a result.
    #[error("Fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Returns true for failures worth retrying later.
    ///
    /// Decode errors and 4xx responses other than 408/429 are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(_) | FetchError::Timeout(_) | FetchError::Cancelled => true,
            FetchError::Status { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            FetchError::Decode(_) => false,
        }
    }
}

/// Opaque credential attached to every tile request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    session_id: String,
}

impl Credentials {
    /// Wraps a session identifier.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }

    /// The raw session identifier.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

/// Loads and decodes one tile image.
///
/// The returned future runs on the Tokio runtime, away from the thread that
/// owns the cache; its result is marshalled back before it touches any tile
/// state.
pub trait TileFetcher: Send + Sync + 'static {
    /// Fetches the image at `url`.
    fn fetch_tile(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> impl Future<Output = Result<RawImage, FetchError>> + Send;
}
