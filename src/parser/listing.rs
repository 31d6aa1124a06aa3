//! `devtunnel list`, `port show` and `user show` output

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::client::models::{AuthProvider, Port, Protocol, TunnelStatus, TunnelSummary, UserInfo};

static LOGGED_IN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Logged in as (.+?) using (GitHub|Microsoft)\.").expect("valid regex")
});

/// Lines before the first tunnel row: count, blank line, column headers
const LIST_HEADER_LINES: usize = 3;

/// Parse the `devtunnel list` table.
///
/// Columns are whitespace separated: ID, host connections, labels (may be
/// empty), port count, expiration (`N day(s)`), description. Port numbers are
/// not part of the listing and stay empty. `now` anchors the relative
/// expiration.
pub fn parse_tunnel_list(output: &str, now: DateTime<Utc>) -> Vec<TunnelSummary> {
    output
        .lines()
        .skip(LIST_HEADER_LINES)
        .filter_map(|line| parse_list_row(line, now))
        .collect()
}

fn parse_list_row(line: &str, now: DateTime<Utc>) -> Option<TunnelSummary> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let tunnel_id = parts.first()?.to_string();

    let host_connections = parts.get(1).and_then(|s| s.parse::<u32>().ok());
    let day_idx = parts.iter().position(|&p| p == "day" || p == "days");

    let expires_at = day_idx
        .filter(|&idx| idx > 0)
        .and_then(|idx| parts[idx - 1].parse::<i64>().ok())
        .filter(|&days| days > 0)
        .and_then(Duration::try_days)
        .and_then(|delta| now.checked_add_signed(delta));

    let description = day_idx
        .filter(|&idx| idx + 1 < parts.len())
        .map(|idx| parts[idx + 1..].join(" "));

    // Labels sit between the host connection count and the port count
    let tags = day_idx
        .filter(|&idx| idx >= 4)
        .map(|idx| {
            parts[2..idx - 2]
                .iter()
                .flat_map(|label| label.split(','))
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|tags| !tags.is_empty());

    let status = match host_connections {
        Some(count) if count > 0 => TunnelStatus::Active,
        _ => TunnelStatus::Stopped,
    };

    Some(TunnelSummary {
        tunnel_id,
        description,
        tags,
        ports: Vec::new(),
        status,
        host_connections,
        expires_at,
    })
}

/// Parse the `devtunnel port show` key/value block.
///
/// Returns `None` unless both the port number and protocol are present.
pub fn parse_port_show(output: &str) -> Option<Port> {
    let mut port_number = None;
    let mut protocol = None;
    let mut description = None;

    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "Port Number" => port_number = value.parse::<u16>().ok(),
            "Protocol" => protocol = Some(Protocol::from_output(value)),
            "Description" if !value.is_empty() => description = Some(value.to_string()),
            _ => {}
        }
    }

    Some(Port {
        port_number: port_number?,
        protocol: protocol?,
        description,
        port_forwarding_uris: None,
        inspect_uri: None,
    })
}

/// Parse `devtunnel user show`, e.g. `Logged in as octo-dev using GitHub.`
pub fn parse_user_info(output: &str) -> Option<UserInfo> {
    let caps = LOGGED_IN.captures(output)?;
    let user_name = caps[1].to_string();
    let provider = match &caps[2] {
        "GitHub" => AuthProvider::GitHub,
        _ => AuthProvider::Microsoft,
    };

    Some(UserInfo {
        user_id: user_name.clone(),
        user_name: Some(user_name),
        email: None,
        provider,
        is_authenticated: true,
    })
}
