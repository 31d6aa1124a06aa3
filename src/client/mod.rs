//! Command bridge to the devtunnel backend
//!
//! Every remote operation goes through a [`CommandBridge`]: a command name plus
//! JSON arguments in, a [`CommandResponse`] envelope out. The [`Dispatcher`]
//! turns envelopes into typed results and owns the retry policy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod devtunnel;
pub mod dispatch;
#[cfg(test)]
pub mod fixtures;
#[cfg(test)]
pub mod mock;
pub mod models;

pub use devtunnel::DevTunnelBridge;
pub use dispatch::{Dispatcher, RetryPolicy};
#[cfg(test)]
pub use mock::MockBridge;

/// Uniform success/data/error wrapper returned by every remote operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> CommandResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl CommandResponse<Value> {
    /// Serialize a typed payload into a successful envelope
    pub fn from_payload<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self::success(value),
            Err(e) => Self::error(format!("Failed to encode response: {}", e)),
        }
    }
}

/// The sole I/O boundary of the core
///
/// Implementations never fail outside the envelope: transport problems are
/// reported as `success == false` with an error message.
#[async_trait]
pub trait CommandBridge: Send + Sync {
    async fn invoke(&self, command: &str, args: Value) -> CommandResponse<Value>;
}

/// Remote command names understood by the bridge
pub mod commands {
    pub const LOGIN: &str = "login_devtunnel";
    pub const LOGOUT: &str = "logout_devtunnel";
    pub const GET_USER_INFO: &str = "get_user_info";

    pub const CREATE_TUNNEL: &str = "create_tunnel";
    pub const LIST_TUNNELS: &str = "list_tunnels";
    pub const LIST_TUNNELS_LIGHT: &str = "list_tunnels_light";
    pub const SHOW_TUNNEL: &str = "show_tunnel";
    pub const UPDATE_TUNNEL: &str = "update_tunnel";
    pub const DELETE_TUNNEL: &str = "delete_tunnel";
    pub const DELETE_ALL_TUNNELS: &str = "delete_all_tunnels";
    pub const HOST_TUNNEL: &str = "host_tunnel";
    pub const STOP_TUNNEL: &str = "stop_tunnel";
    pub const RESTART_TUNNEL: &str = "restart_tunnel";
    pub const GET_TUNNEL_START_TIME: &str = "get_tunnel_start_time";

    pub const CREATE_PORT: &str = "create_port";
    pub const LIST_PORTS: &str = "list_ports";
    pub const SHOW_PORT: &str = "show_port";
    pub const UPDATE_PORT: &str = "update_port";
    pub const DELETE_PORT: &str = "delete_port";
    pub const PING_PORT: &str = "ping_port";

    pub const CREATE_ACCESS: &str = "create_access";
    pub const LIST_ACCESS: &str = "list_access";
    pub const RESET_ACCESS: &str = "reset_access";

    pub const LIST_CLUSTERS: &str = "list_clusters";
    pub const CHECK_INSTALLATION: &str = "check_devtunnel_installation";
    pub const OPEN_URL: &str = "open_url";
}
