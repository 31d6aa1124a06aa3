//! CLI command definitions and handlers

use clap::{Parser, Subcommand};

pub mod access;
pub mod args;
pub mod auth;
pub mod config;
pub mod context;
pub mod port;
pub mod system;
pub mod tunnel;

pub use args::{GlobalOptions, HostArgs, OutputFormat};
pub use context::CommandContext;

use tunnelsync::client::models::Protocol;

/// tunnelsync - cache-aware companion for the devtunnel CLI
#[derive(Parser, Debug)]
#[command(name = "tunnelsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "TUNNELSYNC_FORMAT",
        default_value = "table",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "TUNNELSYNC_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "TUNNELSYNC_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in to devtunnel
    Login {
        /// Sign in with GitHub instead of Microsoft
        #[arg(long)]
        github: bool,

        /// Use the device code flow (for headless machines)
        #[arg(long)]
        device_code: bool,
    },

    /// Sign out of devtunnel
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Manage tunnels
    #[command(subcommand)]
    Tunnel(TunnelCommands),

    /// Manage tunnel ports
    #[command(subcommand)]
    Port(PortCommands),

    /// Manage tunnel access control
    #[command(subcommand)]
    Access(AccessCommands),

    /// List relay clusters
    #[command(subcommand)]
    Cluster(ClusterCommands),

    /// Check the devtunnel installation
    Doctor,

    /// Open a URL in the default browser
    Open {
        /// http(s) URL to open
        url: String,
    },

    /// Keep verifying the session until interrupted
    Watch {
        /// Seconds between ticks
        #[arg(long, default_value = "60")]
        interval: u64,
    },

    /// Manage the tunnelsync configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Tunnel subcommands
#[derive(Subcommand, Debug)]
pub enum TunnelCommands {
    /// List tunnels
    #[command(visible_alias = "ls")]
    List {
        /// Only tunnels carrying these tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Require every tag instead of any
        #[arg(long, requires = "tags")]
        all_tags: bool,

        /// Bypass the cache
        #[arg(long)]
        force: bool,
    },

    /// Show a tunnel's details
    Show {
        tunnel_id: String,

        /// Bypass the cache
        #[arg(long)]
        force: bool,
    },

    /// Create a persistent tunnel
    Create {
        /// Tunnel ID; devtunnel picks one when omitted
        tunnel_id: Option<String>,

        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Allow anonymous clients
        #[arg(long, short = 'a')]
        allow_anonymous: bool,

        /// Tunnel expiration, e.g. 8h or 30d
        #[arg(long)]
        expiration: Option<String>,
    },

    /// Update a tunnel's description, tags or expiration
    Update {
        tunnel_id: String,

        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Replace the tags (comma-separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "remove_tags")]
        tags: Vec<String>,

        /// Remove all tags
        #[arg(long)]
        remove_tags: bool,

        #[arg(long)]
        expiration: Option<String>,
    },

    /// Delete a tunnel
    #[command(visible_alias = "rm")]
    Delete {
        tunnel_id: String,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Delete every tunnel of the signed-in user
    DeleteAll {
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Start hosting a tunnel in the background
    Host {
        /// Persistent tunnel to host; a temporary tunnel is created when omitted
        tunnel_id: Option<String>,

        #[command(flatten)]
        host: HostArgs,
    },

    /// Stop the local host process of a tunnel
    Stop { tunnel_id: String },

    /// Stop and host a tunnel again
    Restart {
        tunnel_id: String,

        #[command(flatten)]
        host: HostArgs,
    },

    /// Show whether a tunnel is hosted and since when
    Status { tunnel_id: String },
}

/// Port subcommands
#[derive(Subcommand, Debug)]
pub enum PortCommands {
    /// List a tunnel's ports with their forwarding URLs
    #[command(visible_alias = "ls")]
    List {
        tunnel_id: String,

        /// Ask devtunnel for its port list directly, without the detail view
        #[arg(long)]
        direct: bool,
    },

    /// Add a port to a tunnel
    Add {
        tunnel_id: String,
        port_number: u16,

        /// http, https or auto
        #[arg(long)]
        protocol: Option<Protocol>,

        #[arg(long, short = 'd')]
        description: Option<String>,
    },

    /// Change a port's protocol or description
    Update {
        tunnel_id: String,
        port_number: u16,

        /// http, https or auto; changing it recreates the port
        #[arg(long)]
        protocol: Option<Protocol>,

        #[arg(long, short = 'd')]
        description: Option<String>,
    },

    /// Remove a port from a tunnel
    #[command(visible_alias = "rm")]
    Delete { tunnel_id: String, port_number: u16 },

    /// Check that a forwarding URL answers
    Ping { url: String },
}

/// Access subcommands
#[derive(Subcommand, Debug)]
pub enum AccessCommands {
    /// List a tunnel's access control entries
    #[command(visible_alias = "ls")]
    List { tunnel_id: String },

    /// Add an access control entry
    Create {
        tunnel_id: String,

        /// Start from a built-in template (see `access presets`)
        #[arg(long, conflicts_with_all = ["anonymous", "org"])]
        preset: Option<String>,

        /// Grant anonymous access
        #[arg(long, conflicts_with = "org")]
        anonymous: bool,

        /// Grant access to members of a GitHub organization
        #[arg(long)]
        org: Option<String>,

        /// Restrict the entry to these ports (repeatable)
        #[arg(short = 'p', long = "port")]
        ports: Vec<u16>,

        /// Entry expiration, e.g. 24h
        #[arg(long)]
        expiration: Option<String>,
    },

    /// Reset a tunnel's access control to the defaults
    Reset {
        tunnel_id: String,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// List the built-in access templates
    Presets,
}

/// Cluster subcommands
#[derive(Subcommand, Debug)]
pub enum ClusterCommands {
    /// List relay clusters
    #[command(visible_alias = "ls")]
    List {
        /// Measure latency to each cluster
        #[arg(long)]
        ping: bool,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a configuration file with default settings
    Init {
        /// Path to the devtunnel binary
        #[arg(long)]
        binary_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,
}
