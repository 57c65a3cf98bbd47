//! INI configuration file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use super::stream::StreamConfig;
use crate::hierarchy::{ConfigError, HierarchyConfig};
use crate::scheduler::RetryPolicy;

const SOURCE: &str = "source";
const STREAM: &str = "stream";

/// Errors loading, saving or interpreting a configuration file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value '{value}' for {section}.{key}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
    },

    #[error("No image source configured (set [source] url)")]
    MissingSource,

    #[error(transparent)]
    Hierarchy(#[from] ConfigError),
}

/// Default configuration file location: `<config dir>/quadstream/config.ini`.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quadstream")
        .join("config.ini")
}

/// The `[source]` section: where tiles come from and how the pyramid is
/// shaped.
///
/// Leaving out `tile_size`, `width` and `height` describes a single image
/// whose size is learned from the root tile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceSettings {
    pub url: Option<String>,
    pub tile_size: Option<u32>,
    pub max_level: Option<u8>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub level_offset: i32,
    pub session_id: Option<String>,
}

/// Contents of `config.ini`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigFile {
    pub source: SourceSettings,
    pub stream: StreamConfig,
}

impl ConfigFile {
    /// Loads the file at [`config_file_path`].
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Loads `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| ConfigFileError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Interprets parsed INI contents.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigFileError> {
        let source = SourceSettings {
            url: get(ini, SOURCE, "url").map(str::to_string),
            tile_size: parse(ini, SOURCE, "tile_size")?,
            max_level: parse(ini, SOURCE, "max_level")?,
            width: parse(ini, SOURCE, "width")?,
            height: parse(ini, SOURCE, "height")?,
            level_offset: parse(ini, SOURCE, "level_offset")?.unwrap_or(0),
            session_id: get(ini, SOURCE, "session_id").map(str::to_string),
        };

        let mut stream = StreamConfig::default();
        if let Some(capacity) = parse(ini, STREAM, "cache_capacity")? {
            stream.cache_capacity = capacity;
        }
        if let Some(limit) = parse_positive(ini, STREAM, "max_concurrent")? {
            stream.max_concurrent_requests = limit;
        }
        if let Some(budget) = parse_positive(ini, STREAM, "new_textures_per_frame")? {
            stream.new_textures_per_frame = budget;
        }
        if let Some(max_splits) = parse_positive(ini, STREAM, "max_splits")? {
            stream.max_splits = max_splits;
        }
        if let Some(secs) = parse_positive(ini, STREAM, "fetch_timeout_secs")? {
            stream.fetch.timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_positive(ini, STREAM, "max_attempts")? {
            stream.fetch.retry = RetryPolicy::exponential(attempts);
        }

        Ok(Self { source, stream })
    }

    /// Writes to [`config_file_path`].
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Writes to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        let write_error = |source| ConfigFileError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        self.to_ini().write_to_file(path).map_err(write_error)
    }

    /// Renders the configuration as INI.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        {
            let mut section = ini.with_section(Some(SOURCE));
            let source = &self.source;
            section.set("url", source.url.clone().unwrap_or_default());
            if let Some(tile_size) = source.tile_size {
                section.set("tile_size", tile_size.to_string());
            }
            if let Some(max_level) = source.max_level {
                section.set("max_level", max_level.to_string());
            }
            if let Some(width) = source.width {
                section.set("width", width.to_string());
            }
            if let Some(height) = source.height {
                section.set("height", height.to_string());
            }
            section.set("level_offset", source.level_offset.to_string());
            if let Some(session_id) = &source.session_id {
                section.set("session_id", session_id.as_str());
            }
        }
        let stream = &self.stream;
        ini.with_section(Some(STREAM))
            .set("cache_capacity", stream.cache_capacity.to_string())
            .set("max_concurrent", stream.max_concurrent_requests.to_string())
            .set(
                "new_textures_per_frame",
                stream.new_textures_per_frame.to_string(),
            )
            .set("max_splits", stream.max_splits.to_string())
            .set(
                "fetch_timeout_secs",
                stream.fetch.timeout.as_secs().max(1).to_string(),
            )
            .set("max_attempts", stream.fetch.retry.max_attempts().to_string());
        ini
    }

    /// Builds the hierarchy described by `[source]`.
    pub fn to_hierarchy(&self) -> Result<HierarchyConfig, ConfigFileError> {
        let source = &self.source;
        let url = source
            .url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(ConfigFileError::MissingSource)?;

        let mut builder = HierarchyConfig::builder(url).level_offset(source.level_offset);
        if let Some(tile_size) = source.tile_size {
            builder = builder.tile_size(tile_size);
        }
        if let Some(max_level) = source.max_level {
            builder = builder.max_level(max_level);
        }
        match (source.width, source.height) {
            (Some(width), Some(height)) => builder = builder.dimensions(width, height),
            (None, None) => {}
            (None, Some(_)) => return Err(ConfigError::Missing("tex_width").into()),
            (Some(_), None) => return Err(ConfigError::Missing("tex_height").into()),
        }
        if let Some(session_id) = &source.session_id {
            builder = builder.session_id(session_id.clone());
        }
        Ok(builder.build()?)
    }
}

fn get<'a>(ini: &'a Ini, section: &'static str, key: &'static str) -> Option<&'a str> {
    ini.get_from(Some(section), key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse<T: FromStr>(
    ini: &Ini,
    section: &'static str,
    key: &'static str,
) -> Result<Option<T>, ConfigFileError> {
    match get(ini, section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigFileError::InvalidValue {
                section,
                key,
                value: raw.to_string(),
            }),
    }
}

/// Parses an unsigned count that must not be zero.
fn parse_positive<T: FromStr + Default + PartialEq + ToString>(
    ini: &Ini,
    section: &'static str,
    key: &'static str,
) -> Result<Option<T>, ConfigFileError> {
    match parse::<T>(ini, section, key)? {
        Some(value) if value == T::default() => Err(ConfigFileError::InvalidValue {
            section,
            key,
            value: value.to_string(),
        }),
        value => Ok(value),
    }
}
