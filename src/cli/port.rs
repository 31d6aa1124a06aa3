//! Port command implementations

use colored::Colorize;
use tabled::Tabled;

use tunnelsync::Result;
use tunnelsync::client::models::{CreatePortRequest, PingResult, Port, Protocol, UpdatePortRequest};

use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::output::{self, json, table};

/// Port for table display
#[derive(Tabled)]
struct PortDisplay {
    #[tabled(rename = "PORT")]
    port: u16,
    #[tabled(rename = "PROTOCOL")]
    protocol: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
}

impl From<&Port> for PortDisplay {
    fn from(port: &Port) -> Self {
        Self {
            port: port.port_number,
            protocol: port.protocol.to_string(),
            url: table::or_dash(port.forwarding_url()),
            description: table::or_dash(port.description.clone()),
        }
    }
}

/// Run the port list command
pub async fn list(opts: &GlobalOptions, tunnel_id: &str, direct: bool) -> Result<()> {
    let ctx = CommandContext::new(opts)?;

    let ports = if direct {
        ctx.service.list_ports(tunnel_id).await?
    } else {
        ctx.service.ports(tunnel_id).await?
    };

    output::print_list::<_, PortDisplay>(ctx.format, &ports)
}

/// Run the port add command
pub async fn add(
    opts: &GlobalOptions,
    tunnel_id: String,
    port_number: u16,
    protocol: Option<Protocol>,
    description: Option<String>,
) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let req = CreatePortRequest {
        tunnel_id,
        port_number,
        protocol,
        description,
    };

    let out = ctx.service.create_port(&req).await?;
    output::print_message(ctx.format, &out)
}

/// Run the port update command
pub async fn update(
    opts: &GlobalOptions,
    tunnel_id: String,
    port_number: u16,
    protocol: Option<Protocol>,
    description: Option<String>,
) -> Result<()> {
    if protocol.is_none() && description.is_none() {
        return Err(tunnelsync::Error::Other(
            "Nothing to update; pass --protocol or --description".to_string(),
        ));
    }

    let ctx = CommandContext::new(opts)?;
    let req = UpdatePortRequest {
        tunnel_id,
        port_number,
        description,
        protocol,
    };

    let out = ctx.service.update_port(&req).await?;
    output::print_message(ctx.format, &out)
}

/// Run the port delete command
pub async fn delete(opts: &GlobalOptions, tunnel_id: &str, port_number: u16) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let out = ctx.service.delete_port(tunnel_id, port_number).await?;
    output::print_message(ctx.format, &out)
}

/// Run the port ping command
pub async fn ping(opts: &GlobalOptions, url: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let result = ctx.service.ping_port(url).await?;

    match ctx.format {
        OutputFormat::Table => print_ping(url, &result),
        OutputFormat::Json => println!("{}", json::format_json(&result)?),
    }
    Ok(())
}

fn print_ping(url: &str, result: &PingResult) {
    if result.success {
        println!(
            "{} {} answered {} in {} ms",
            "✓".green(),
            url,
            table::or_dash(result.status_code),
            result.response_time_ms
        );
    } else {
        println!(
            "{} {} unreachable after {} ms: {}",
            "✗".red(),
            url,
            result.response_time_ms,
            result
                .error
                .clone()
                .or_else(|| result.status_code.map(|code| format!("HTTP {}", code)))
                .unwrap_or_else(|| "no response".to_string())
        );
    }
}
