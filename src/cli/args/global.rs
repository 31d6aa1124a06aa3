//! Global CLI options shared across all commands

use std::path::PathBuf;

use tunnelsync::Result;
use tunnelsync::config::Config;

use crate::cli::{Cli, OutputFormat};

/// Global CLI options passed to all command handlers.
///
/// Precedence is CLI flag, then environment variable, then default.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Output format (table, json)
    pub format: OutputFormat,

    /// Custom config file path (defaults to ~/.tunnelsync/config.yaml)
    pub config: Option<String>,
}

impl GlobalOptions {
    /// Create GlobalOptions from a parsed CLI struct.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
        }
    }

    /// Get config path as `Option<&str>`.
    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    /// Config file location, falling back to the default path
    pub fn config_path(&self) -> Result<PathBuf> {
        match self.config_ref() {
            Some(path) => Ok(PathBuf::from(path)),
            None => Config::default_path(),
        }
    }
}
