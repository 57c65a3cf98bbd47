//! Streamer configuration.
//!
//! [`StreamConfig`] carries the runtime limits of a streamer. [`ConfigFile`]
//! loads them, together with the image source, from an INI file:
//!
//! ```ini
//! [source]
//! url = https://tiles.example.com/{z}/{x}/{y}.jpg
//! tile_size = 256
//! width = 40000
//! height = 30000
//!
//! [stream]
//! cache_capacity = 256
//! max_concurrent = 5
//! new_textures_per_frame = 5
//! max_splits = 100
//! fetch_timeout_secs = 30
//! max_attempts = 3
//! ```
//!
//! Keys that are absent fall back to their defaults.

mod file;
mod stream;

pub use file::{config_file_path, ConfigFile, ConfigFileError, SourceSettings};
pub use stream::{StreamConfig, DEFAULT_CACHE_CAPACITY, DEFAULT_NEW_TEXTURES_PER_FRAME};
