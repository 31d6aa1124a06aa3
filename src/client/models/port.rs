//! Port models

use serde::{Deserialize, Serialize};

use super::Protocol;

/// A forwarded port with its details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub port_number: u16,

    #[serde(default)]
    pub protocol: Protocol,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Public URLs; empty while the tunnel is not hosted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_forwarding_uris: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspect_uri: Option<String>,
}

impl Port {
    /// Minimal port built from a parsed detail-text record
    pub fn from_record(record: &PortRecord) -> Self {
        Self {
            port_number: record.port,
            protocol: record.protocol,
            description: None,
            port_forwarding_uris: record.url.as_ref().map(|url| vec![url.clone()]),
            inspect_uri: None,
        }
    }

    /// First forwarding URL, if the port is currently forwarded
    pub fn forwarding_url(&self) -> Option<&str> {
        self.port_forwarding_uris
            .as_ref()
            .and_then(|uris| uris.first())
            .map(String::as_str)
    }
}

/// Port fact derived from a tunnel's detail text
///
/// Never stored; recomputed from the cached text on every read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRecord {
    pub port: u16,
    pub protocol: Protocol,
    /// `None` when the port is declared but not forwarded
    pub url: Option<String>,
}

/// Arguments for `create_port`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePortRequest {
    pub tunnel_id: String,
    pub port_number: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Arguments for `update_port`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePortRequest {
    pub tunnel_id: String,
    pub port_number: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
}

/// Reachability probe of a forwarded URL
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub response_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
