//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};

use clap::Args;
use quadstream::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Image source flags shared by `inspect` and `simulate`.
///
/// Each flag overrides the matching `[source]` key of the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Tile URL template with {z}, {x} and {y} placeholders
    #[arg(long)]
    pub url: Option<String>,

    /// Tile edge length in pixels
    #[arg(long)]
    pub tile_size: Option<u32>,

    /// Deepest pyramid level (computed from the image size if omitted)
    #[arg(long)]
    pub max_level: Option<u8>,

    /// Full-resolution image width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Full-resolution image height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Added to the level when filling {z}
    #[arg(long, allow_hyphen_values = true)]
    pub level_offset: Option<i32>,

    /// Session token sent with every tile request
    #[arg(long)]
    pub session_id: Option<String>,
}

/// Loads the config file at `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let path = resolve_config_path(path);
    Ok(ConfigFile::load_from(&path)?)
}

/// `path` if given, otherwise the default config file location.
pub fn resolve_config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf).unwrap_or_else(config_file_path)
}

/// Applies CLI source flags over the config file.
pub fn apply_source_args(config: &mut ConfigFile, args: &SourceArgs) {
    // CLI takes precedence, then config
    let source = &mut config.source;
    if let Some(url) = &args.url {
        source.url = Some(url.clone());
    }
    if args.tile_size.is_some() {
        source.tile_size = args.tile_size;
    }
    if args.max_level.is_some() {
        source.max_level = args.max_level;
    }
    if args.width.is_some() {
        source.width = args.width;
    }
    if args.height.is_some() {
        source.height = args.height;
    }
    if let Some(offset) = args.level_offset {
        source.level_offset = offset;
    }
    if let Some(session_id) = &args.session_id {
        source.session_id = Some(session_id.clone());
    }
}

/// Builds the async runtime that fetches run on.
pub fn build_runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("quadstream-fetch")
        .build()
        .map_err(CliError::Runtime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = ConfigFile::default();
        config.source.url = Some("https://ini/{z}/{x}/{y}".to_string());
        config.source.tile_size = Some(512);
        config.source.level_offset = 3;

        let args = SourceArgs {
            url: Some("https://flag/{z}/{x}/{y}".to_string()),
            width: Some(4096),
            height: Some(2048),
            ..Default::default()
        };
        apply_source_args(&mut config, &args);

        assert_eq!(config.source.url.as_deref(), Some("https://flag/{z}/{x}/{y}"));
        assert_eq!(config.source.tile_size, Some(512));
        assert_eq!(config.source.width, Some(4096));
        assert_eq!(config.source.level_offset, 3);
    }

    #[test]
    fn test_missing_config_file_gives_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = load_config(Some(&temp.path().join("absent.ini"))).unwrap();
        assert_eq!(config, ConfigFile::default());
    }
}
