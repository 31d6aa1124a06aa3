//! Tunnel command implementations

use colored::Colorize;
use dialoguer::Confirm;
use tabled::Tabled;

use tunnelsync::Result;
use tunnelsync::client::models::{
    CreateTunnelRequest, HostStatus, ListTunnelsRequest, TunnelSummary, UpdateTunnelRequest,
};

use crate::cli::{CommandContext, GlobalOptions, HostArgs, OutputFormat};
use crate::output::{self, json, table};

/// Tunnel for table display
#[derive(Tabled)]
struct TunnelDisplay {
    #[tabled(rename = "TUNNEL ID")]
    id: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "HOSTS")]
    hosts: String,
    #[tabled(rename = "PORTS")]
    ports: String,
    #[tabled(rename = "TAGS")]
    tags: String,
    #[tabled(rename = "EXPIRES")]
    expires: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
}

impl From<&TunnelSummary> for TunnelDisplay {
    fn from(tunnel: &TunnelSummary) -> Self {
        let ports = if tunnel.ports.is_empty() {
            "-".to_string()
        } else {
            tunnel
                .ports
                .iter()
                .map(u16::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        Self {
            id: tunnel.tunnel_id.clone(),
            status: tunnel.status.to_string(),
            hosts: table::or_dash(tunnel.host_connections),
            ports,
            tags: table::or_dash(tunnel.tags.as_ref().map(|tags| tags.join(", "))),
            expires: table::or_dash(
                tunnel
                    .expires_at
                    .map(|at| at.format("%Y-%m-%d").to_string()),
            ),
            description: table::or_dash(tunnel.description.clone()),
        }
    }
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() { None } else { Some(values) }
}

fn confirm(prompt: String) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

/// Run the tunnel list command
pub async fn list(opts: &GlobalOptions, tags: Vec<String>, all_tags: bool, force: bool) -> Result<()> {
    let ctx = CommandContext::new(opts)?;

    let tunnels = match non_empty(tags) {
        Some(tags) => {
            let req = ListTunnelsRequest {
                tags: Some(tags),
                all_tags: Some(all_tags),
            };
            ctx.service.list_tunnels_filtered(&req).await?
        }
        None => ctx.service.list_tunnels(force).await?,
    };

    output::print_list::<_, TunnelDisplay>(ctx.format, &tunnels)
}

/// Run the tunnel show command
pub async fn show(opts: &GlobalOptions, tunnel_id: &str, force: bool) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let detail = ctx.service.show_tunnel(tunnel_id, force).await?;

    match ctx.format {
        OutputFormat::Table => println!("{}", detail.trim_end()),
        OutputFormat::Json => {
            let data = serde_json::json!({ "tunnelId": tunnel_id, "detail": detail });
            println!("{}", json::format_json(&data)?);
        }
    }
    Ok(())
}

/// Run the tunnel create command
pub async fn create(
    opts: &GlobalOptions,
    tunnel_id: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
    allow_anonymous: bool,
    expiration: Option<String>,
) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let req = CreateTunnelRequest {
        tunnel_id,
        description,
        tags: non_empty(tags),
        allow_anonymous: allow_anonymous.then_some(true),
        expiration,
    };

    let out = ctx.service.create_tunnel(&req).await?;
    output::print_message(ctx.format, &out)
}

/// Run the tunnel update command
pub async fn update(
    opts: &GlobalOptions,
    tunnel_id: String,
    description: Option<String>,
    tags: Vec<String>,
    remove_tags: bool,
    expiration: Option<String>,
) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let req = UpdateTunnelRequest {
        tunnel_id,
        description,
        tags: non_empty(tags),
        remove_tags: remove_tags.then_some(true),
        expiration,
    };

    let out = ctx.service.update_tunnel(&req).await?;
    output::print_message(ctx.format, &out)
}

/// Run the tunnel delete command
pub async fn delete(opts: &GlobalOptions, tunnel_id: &str, yes: bool) -> Result<()> {
    if !yes && !confirm(format!("Delete tunnel '{}'?", tunnel_id))? {
        eprintln!("Cancelled.");
        return Ok(());
    }

    let ctx = CommandContext::new(opts)?;
    let out = ctx.service.delete_tunnel(tunnel_id).await?;
    output::print_message(ctx.format, &out)
}

/// Run the tunnel delete-all command
pub async fn delete_all(opts: &GlobalOptions, yes: bool) -> Result<()> {
    if !yes {
        eprintln!(
            "{} This deletes every tunnel of the signed-in user.",
            "⚠".yellow()
        );
        if !confirm("Delete all tunnels?".to_string())? {
            eprintln!("Cancelled.");
            return Ok(());
        }
    }

    let ctx = CommandContext::new(opts)?;
    let out = ctx.service.delete_all_tunnels().await?;
    output::print_message(ctx.format, &out)
}

/// Run the tunnel host command
pub async fn host(opts: &GlobalOptions, tunnel_id: Option<String>, args: HostArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let req = args.into_request(tunnel_id, &ctx.config.host);

    let out = ctx.service.host_tunnel(&req).await?;
    output::print_message(ctx.format, &out)
}

/// Run the tunnel stop command
pub async fn stop(opts: &GlobalOptions, tunnel_id: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let out = ctx.service.stop_tunnel(tunnel_id).await?;
    output::print_message(ctx.format, &out)
}

/// Run the tunnel restart command
pub async fn restart(opts: &GlobalOptions, tunnel_id: String, args: HostArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let req = args.into_request(Some(tunnel_id), &ctx.config.host);

    let out = ctx.service.restart_tunnel(&req).await?;
    output::print_message(ctx.format, &out)
}

/// Run the tunnel status command
pub async fn status(opts: &GlobalOptions, tunnel_id: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let status = ctx.service.host_status(tunnel_id).await?;

    match ctx.format {
        OutputFormat::Table => print_status(tunnel_id, &status),
        OutputFormat::Json => println!("{}", json::format_json(&status)?),
    }
    Ok(())
}

fn print_status(tunnel_id: &str, status: &HostStatus) {
    println!("{}\n", tunnel_id.bold());

    if status.hosted {
        println!("{} Hosted", "✓".green());
    } else {
        println!("{} Not hosted", "○".dimmed());
    }

    match status.host_connections {
        Some(n) => println!("  Host connections: {}", n),
        None => println!("  Host connections: {}", "unknown".dimmed()),
    }

    if let Some(started) = &status.started_at {
        println!("  Started: {}", started);
    }
}
