//! Hierarchy configuration errors.

use thiserror::Error;

use crate::coord::MAX_LEVEL;

/// Errors raised while validating a [`HierarchyConfig`](super::HierarchyConfig).
///
/// These surface synchronously at construction; a streamer refuses to start
/// with an invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The URL template is empty.
    #[error("URL pattern must not be empty")]
    EmptyUrlPattern,

    /// A required dimension is zero.
    #[error("{0} must be positive")]
    NonPositive(&'static str),

    /// Some but not all of the explicit extents were supplied.
    #[error("{0} is required when explicit extents are given")]
    Missing(&'static str),

    /// The pyramid would be deeper than the addressable range.
    #[error("Pyramid depth {0} exceeds the maximum level {MAX_LEVEL}")]
    TooDeep(u32),
}
