//! `devtunnel show` detail text
//!
//! ```text
//! Tunnel ID             : bright-fox.usw2
//! Host connections      : 1
//! Ports                 : 2
//!   8080  http   https://bright-fox-8080.usw2.devtunnels.ms/
//!   3000  https
//! Tunnel Expiration     : 30 days
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::client::models::{PortRecord, Protocol};

static FORWARDED_PORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s+(\w+)\s+(https?://\S+)").expect("valid regex"));

static DECLARED_PORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\s+(\w+)\s*$").expect("valid regex"));

static HOST_CONNECTIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Host connections\s*:\s*(\d+)").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    BeforePorts,
    InPorts,
    AfterPorts,
}

/// Extract port records from a tunnel's detail text.
///
/// Records keep their order of appearance, duplicates included.
pub fn parse_ports(detail: &str) -> Vec<PortRecord> {
    let mut ports = Vec::new();
    let mut section = Section::BeforePorts;

    for line in detail.lines() {
        let trimmed = line.trim();

        match section {
            Section::BeforePorts => {
                if trimmed.starts_with("Ports") && trimmed.contains(':') {
                    section = Section::InPorts;
                }
            }
            Section::InPorts => {
                if trimmed.starts_with("Tunnel") {
                    section = Section::AfterPorts;
                } else if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
                    if let Some(record) = parse_port_line(trimmed) {
                        ports.push(record);
                    }
                }
            }
            Section::AfterPorts => break,
        }
    }

    ports
}

fn parse_port_line(line: &str) -> Option<PortRecord> {
    if let Some(caps) = FORWARDED_PORT.captures(line) {
        return Some(PortRecord {
            port: caps[1].parse().ok()?,
            protocol: Protocol::from_output(&caps[2]),
            url: Some(caps[3].to_string()),
        });
    }

    let caps = DECLARED_PORT.captures(line)?;
    Some(PortRecord {
        port: caps[1].parse().ok()?,
        protocol: Protocol::from_output(&caps[2]),
        url: None,
    })
}

/// Host connection count, if the detail text carries one
pub fn host_connections(detail: &str) -> Option<u32> {
    HOST_CONNECTIONS
        .captures(detail)
        .and_then(|caps| caps[1].parse().ok())
}

/// A tunnel is hosted while at least one host is connected
pub fn is_hosted(detail: &str) -> bool {
    host_connections(detail).is_some_and(|count| count > 0)
}
