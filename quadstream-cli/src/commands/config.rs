//! Configuration management CLI commands.
//!
//! Provides `config show`, `config init` and `config path`.

use std::path::Path;

use clap::Subcommand;
use quadstream::config::ConfigFile;

use super::common::{load_config, resolve_config_path};
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write a configuration file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(config_path: Option<&Path>, command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_show(config_path),
        ConfigCommands::Init { force } => run_init(config_path, force),
        ConfigCommands::Path => run_path(config_path),
    }
}

/// Show the effective configuration.
fn run_show(config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    for line in render(&config) {
        println!("{}", line);
    }
    Ok(())
}

/// Write a default configuration file.
fn run_init(config_path: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = resolve_config_path(config_path);
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    ConfigFile::default().save_to(&path)?;

    println!("Configuration file: {}", path.display());
    println!();
    println!("Set [source] url to the tile URL template of your image.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

/// Show the configuration file path.
fn run_path(config_path: Option<&Path>) -> Result<(), CliError> {
    println!("{}", resolve_config_path(config_path).display());
    Ok(())
}

fn render(config: &ConfigFile) -> Vec<String> {
    fn show<T: ToString>(value: Option<T>) -> String {
        value
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    }

    let source = &config.source;
    let stream = &config.stream;
    vec![
        "[source]".to_string(),
        format!("  url = {}", show(source.url.as_deref())),
        format!("  tile_size = {}", show(source.tile_size)),
        format!("  max_level = {}", show(source.max_level)),
        format!("  width = {}", show(source.width)),
        format!("  height = {}", show(source.height)),
        format!("  level_offset = {}", source.level_offset),
        format!(
            "  session_id = {}",
            show(source.session_id.as_ref().map(|_| "<set>"))
        ),
        String::new(),
        "[stream]".to_string(),
        format!("  cache_capacity = {}", stream.cache_capacity),
        format!("  max_concurrent = {}", stream.max_concurrent_requests),
        format!("  new_textures_per_frame = {}", stream.new_textures_per_frame),
        format!("  max_splits = {}", stream.max_splits),
        format!("  fetch_timeout_secs = {}", stream.fetch.timeout.as_secs()),
        format!("  max_attempts = {}", stream.fetch.retry.max_attempts()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        run_init(Some(&path), false).unwrap();
        assert!(path.exists());
        assert!(matches!(run_init(Some(&path), false), Err(CliError::Config(_))));
        run_init(Some(&path), true).unwrap();
    }

    #[test]
    fn test_render_hides_session_id() {
        let mut config = ConfigFile::default();
        config.source.session_id = Some("secret".to_string());
        let lines = render(&config);
        assert!(lines.contains(&"  session_id = <set>".to_string()));
        assert!(lines.iter().all(|line| !line.contains("secret")));
        assert!(lines.contains(&"  url = (not set)".to_string()));
    }
}
