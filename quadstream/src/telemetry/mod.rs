//! Streaming telemetry.
//!
//! Lock-free counters updated by the streamer as tiles are requested,
//! loaded, drawn and evicted, plus a point-in-time snapshot for display.
//!
//! ```text
//! TileStreamer ─────► StreamMetrics ─────► StreamSnapshot ─────► CLI
//!                     (atomic counters)    (plain copy)
//! ```
//!
//! # Example
//!
//! ```
//! use quadstream::telemetry::StreamMetrics;
//!
//! let metrics = StreamMetrics::new();
//! metrics.requests_issued(3);
//! metrics.tile_loaded();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.requests_issued, 3);
//! assert_eq!(snapshot.tiles_loaded, 1);
//! ```

mod metrics;
mod snapshot;

pub use metrics::StreamMetrics;
pub use snapshot::StreamSnapshot;
