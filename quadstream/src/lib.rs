//! Quadstream - quadtree tile streaming for very large images
//!
//! This library streams a huge raster image into a real-time scene as a
//! set of textured quads without ever holding the full-resolution image in
//! memory. The image is stored as a pyramid of fixed-size tiles; every frame
//! the streamer decides which tiles to draw, which to fetch and which to
//! evict, and draws coarser ancestors while better tiles are in flight.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use quadstream::config::StreamConfig;
//! use quadstream::hierarchy::HierarchyConfig;
//! use quadstream::provider::{AsyncReqwestClient, HttpTileFetcher};
//! use quadstream::refine::ViewParams;
//! use quadstream::streamer::TileStreamer;
//! use quadstream::texture::HeadlessTextureRegistry;
//!
//! let hierarchy = HierarchyConfig::explicit("https://tiles/{z}/{x}/{y}.jpg", 256, None, 40_000, 30_000)?;
//! let fetcher = Arc::new(HttpTileFetcher::new(AsyncReqwestClient::new()?));
//! let mut streamer = TileStreamer::new(
//!     hierarchy,
//!     StreamConfig::default(),
//!     fetcher,
//!     HeadlessTextureRegistry::new(),
//!     runtime.handle().clone(),
//! )?;
//!
//! loop {
//!     let frame = streamer.update(&view);
//!     if frame.changed {
//!         draw(&frame.commands);
//!     }
//! }
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod fallback;
pub mod hierarchy;
pub mod provider;
pub mod refine;
pub mod scene;
pub mod scheduler;
pub mod streamer;
pub mod telemetry;
pub mod texture;
