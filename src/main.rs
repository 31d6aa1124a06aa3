//! tunnelsync CLI - cache-aware companion for the devtunnel CLI

use clap::Parser;

mod cli;
mod output;

use cli::{
    AccessCommands, Cli, ClusterCommands, Commands, ConfigCommands, GlobalOptions, PortCommands,
    TunnelCommands,
};
use tunnelsync::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// `--debug` forces debug output for this crate; otherwise `RUST_LOG` applies,
/// defaulting to warnings only.
fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_module("tunnelsync", log::LevelFilter::Debug);
    }
    builder.format_timestamp_millis().init();
}

async fn run(cli: Cli) -> Result<()> {
    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Login {
            github,
            device_code,
        } => cli::auth::login(&opts, github, device_code).await,
        Commands::Logout => cli::auth::logout(&opts).await,
        Commands::Whoami => cli::auth::whoami(&opts).await,
        Commands::Tunnel(cmd) => match cmd {
            TunnelCommands::List {
                tags,
                all_tags,
                force,
            } => cli::tunnel::list(&opts, tags, all_tags, force).await,
            TunnelCommands::Show { tunnel_id, force } => {
                cli::tunnel::show(&opts, &tunnel_id, force).await
            }
            TunnelCommands::Create {
                tunnel_id,
                description,
                tags,
                allow_anonymous,
                expiration,
            } => {
                cli::tunnel::create(&opts, tunnel_id, description, tags, allow_anonymous, expiration)
                    .await
            }
            TunnelCommands::Update {
                tunnel_id,
                description,
                tags,
                remove_tags,
                expiration,
            } => {
                cli::tunnel::update(&opts, tunnel_id, description, tags, remove_tags, expiration)
                    .await
            }
            TunnelCommands::Delete { tunnel_id, yes } => {
                cli::tunnel::delete(&opts, &tunnel_id, yes).await
            }
            TunnelCommands::DeleteAll { yes } => cli::tunnel::delete_all(&opts, yes).await,
            TunnelCommands::Host { tunnel_id, host } => {
                cli::tunnel::host(&opts, tunnel_id, host).await
            }
            TunnelCommands::Stop { tunnel_id } => cli::tunnel::stop(&opts, &tunnel_id).await,
            TunnelCommands::Restart { tunnel_id, host } => {
                cli::tunnel::restart(&opts, tunnel_id, host).await
            }
            TunnelCommands::Status { tunnel_id } => cli::tunnel::status(&opts, &tunnel_id).await,
        },
        Commands::Port(cmd) => match cmd {
            PortCommands::List { tunnel_id, direct } => {
                cli::port::list(&opts, &tunnel_id, direct).await
            }
            PortCommands::Add {
                tunnel_id,
                port_number,
                protocol,
                description,
            } => cli::port::add(&opts, tunnel_id, port_number, protocol, description).await,
            PortCommands::Update {
                tunnel_id,
                port_number,
                protocol,
                description,
            } => cli::port::update(&opts, tunnel_id, port_number, protocol, description).await,
            PortCommands::Delete {
                tunnel_id,
                port_number,
            } => cli::port::delete(&opts, &tunnel_id, port_number).await,
            PortCommands::Ping { url } => cli::port::ping(&opts, &url).await,
        },
        Commands::Access(cmd) => match cmd {
            AccessCommands::List { tunnel_id } => cli::access::list(&opts, &tunnel_id).await,
            AccessCommands::Create {
                tunnel_id,
                preset,
                anonymous,
                org,
                ports,
                expiration,
            } => {
                let options = cli::access::AccessOptions {
                    preset,
                    anonymous,
                    org,
                    ports,
                    expiration,
                };
                cli::access::create(&opts, tunnel_id, options).await
            }
            AccessCommands::Reset { tunnel_id, yes } => {
                cli::access::reset(&opts, &tunnel_id, yes).await
            }
            AccessCommands::Presets => cli::access::presets(&opts),
        },
        Commands::Cluster(ClusterCommands::List { ping }) => cli::system::clusters(&opts, ping).await,
        Commands::Doctor => cli::system::doctor(&opts).await,
        Commands::Open { url } => cli::system::open(&opts, &url).await,
        Commands::Watch { interval } => cli::system::watch(&opts, interval).await,
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Init { binary_path, force } => {
                cli::config::init(&opts, binary_path, force)
            }
            ConfigCommands::Show => cli::config::show(&opts),
        },
    }
}
