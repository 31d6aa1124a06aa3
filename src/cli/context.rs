//! Command execution context
//!
//! Loads the configuration and wires the devtunnel bridge, dispatcher and
//! cache-aware service together so handlers only deal with their command.

use log::debug;

use tunnelsync::Result;
use tunnelsync::client::devtunnel::resolve_binary;
use tunnelsync::client::{DevTunnelBridge, Dispatcher};
use tunnelsync::config::Config;
use tunnelsync::service::TunnelService;

use crate::cli::{GlobalOptions, OutputFormat};

/// Context for command execution containing config, service, and output options.
pub struct CommandContext {
    /// Loaded configuration, or defaults when no file exists
    pub config: Config,
    pub service: TunnelService<DevTunnelBridge>,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Create a new command context.
    ///
    /// # Errors
    /// Returns error if an existing config file cannot be parsed or is
    /// invalid, or the HTTP client for port pings cannot be built.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let path = opts.config_path()?;
        let config = Config::load_or_default(&path)?;
        debug!("Loaded configuration from {}", path.display());

        let binary = resolve_binary(config.binary_path.as_deref());
        debug!("Using devtunnel binary: {}", binary);

        let bridge = DevTunnelBridge::new(binary)?;
        let service = TunnelService::new(Dispatcher::with_policy(bridge, config.retry_policy()));

        Ok(Self {
            config,
            service,
            format: opts.format,
        })
    }
}
