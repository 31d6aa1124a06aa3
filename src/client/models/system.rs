//! Installation and cluster models

use serde::{Deserialize, Serialize};

/// Presence of the devtunnel binary on this machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationInfo {
    pub installed: bool,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Relay cluster available for hosting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub cluster_id: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Round-trip time in milliseconds, present when pinged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<u64>,
}
