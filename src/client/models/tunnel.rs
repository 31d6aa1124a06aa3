//! Tunnel models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Forwarding protocol of a tunnel port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    #[default]
    Auto,
}

impl Protocol {
    /// Lenient conversion for CLI output; anything unrecognised is `Auto`.
    pub fn from_output(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "auto" => Ok(Protocol::Auto),
            other => Err(format!("unknown protocol '{}' (expected http, https or auto)", other)),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Auto => "auto",
        };
        f.write_str(s)
    }
}

/// Lifecycle state of a tunnel as shown in listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelStatus {
    Active,
    Stopped,
    Expired,
    Error,
}

impl fmt::Display for TunnelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TunnelStatus::Active => "active",
            TunnelStatus::Stopped => "stopped",
            TunnelStatus::Expired => "expired",
            TunnelStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// One row of the tunnel inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelSummary {
    /// Tunnel ID, e.g. `bright-fox.usw2`
    pub tunnel_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Port numbers; empty until filled from the tunnel's detail text
    #[serde(default)]
    pub ports: Vec<u16>,

    pub status: TunnelStatus,

    /// Active host connections reported by the listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_connections: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Arguments for `create_tunnel`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTunnelRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_anonymous: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
}

/// Arguments for `list_tunnels`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTunnelsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Require every tag instead of any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_tags: Option<bool>,
}

/// Arguments for `update_tunnel`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTunnelRequest {
    pub tunnel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_tags: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
}

/// Arguments for `host_tunnel` and `restart_tunnel`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostTunnelRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel_id: Option<String>,
    #[serde(default)]
    pub ports: Vec<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_anonymous: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
}

/// Hosting state derived from a tunnel's detail text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostStatus {
    pub hosted: bool,
    /// `None` when the detail text carried no host connection count
    pub host_connections: Option<u32>,
    /// Host process start time, only looked up while hosted
    pub started_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parse_is_case_insensitive() {
        assert_eq!("HTTPS".parse::<Protocol>(), Ok(Protocol::Https));
        assert_eq!(" http ".parse::<Protocol>(), Ok(Protocol::Http));
        assert!("ftp".parse::<Protocol>().is_err());
    }

    #[test]
    fn test_protocol_from_output_defaults_to_auto() {
        assert_eq!(Protocol::from_output("tcp"), Protocol::Auto);
        assert_eq!(Protocol::from_output("https"), Protocol::Https);
    }

    #[test]
    fn test_host_request_serializes_camel_case() {
        let req = HostTunnelRequest {
            tunnel_id: Some("t1".to_string()),
            ports: vec![3000],
            allow_anonymous: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["tunnelId"], "t1");
        assert_eq!(json["allowAnonymous"], true);
        assert!(json.get("expiration").is_none());
    }
}
