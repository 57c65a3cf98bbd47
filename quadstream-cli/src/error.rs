//! CLI error type.

use std::path::PathBuf;

use quadstream::config::ConfigFileError;
use quadstream::hierarchy::ConfigError;
use quadstream::provider::FetchError;
use thiserror::Error;

/// Errors surfaced to the user by the `quadstream` binary.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigFileError),

    #[error("Invalid image source: {0}")]
    Hierarchy(#[from] ConfigError),

    #[error("Tile fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::ConfigFile(_) | CliError::Hierarchy(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_exit_with_usage_status() {
        assert_eq!(CliError::Config("bad".into()).exit_code(), 2);
        assert_eq!(CliError::from(ConfigError::EmptyUrlPattern).exit_code(), 2);
        assert_eq!(CliError::from(FetchError::Cancelled).exit_code(), 1);
    }

    #[test]
    fn test_messages_include_cause() {
        let err = CliError::from(ConfigFileError::MissingSource);
        assert!(err.to_string().contains("[source] url"));
    }
}
