//! devtunnel CLI bridge
//!
//! [`DevTunnelBridge`] implements [`CommandBridge`] by running the `devtunnel`
//! binary. Text output is parsed with [`crate::parser`]; JSON output
//! (`port list -j`, `clusters -j`) is decoded directly. Every failure ends up
//! in the envelope's error message.

mod args;
mod process;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use log::{debug, info, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::process::Command;

use super::{CommandBridge, CommandResponse, commands};
use crate::client::models::{
    AuthProvider, Cluster, CreateAccessRequest, CreatePortRequest, CreateTunnelRequest,
    HostTunnelRequest, ListTunnelsRequest, Port, TunnelSummary, UpdatePortRequest,
    UpdateTunnelRequest,
};
use crate::error::{CommandError, Error, Result};
use crate::parser;

/// Environment variable overriding the devtunnel binary location
pub const DEVTUNNEL_BIN_ENV: &str = "DEVTUNNEL_BIN";

const DEFAULT_BINARY: &str = "devtunnel";

/// Pick the devtunnel binary: configured path, then `DEVTUNNEL_BIN`, then `PATH`.
pub fn resolve_binary(configured: Option<&str>) -> String {
    resolve_binary_with(configured, std::env::var(DEVTUNNEL_BIN_ENV).ok())
}

fn resolve_binary_with(configured: Option<&str>, env: Option<String>) -> String {
    configured
        .filter(|p| !p.trim().is_empty())
        .map(str::to_string)
        .or(env.filter(|p| !p.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_BINARY.to_string())
}

/// Command bridge backed by the devtunnel CLI
pub struct DevTunnelBridge {
    binary: String,
    http: reqwest::Client,
}

impl DevTunnelBridge {
    /// Create a bridge running `binary`
    pub fn new(binary: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            binary: binary.into(),
            http,
        })
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run devtunnel to completion and return its stdout.
    async fn run(&self, command: &str, args: &[String], context: &str) -> Result<String> {
        debug!("Running {} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                failure(
                    command,
                    format!("{}: could not run '{}': {}", context, self.binary, e),
                )
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            Err(failure(command, format!("{}: {}", context, detail)))
        }
    }

    async fn dispatch(&self, command: &str, payload: Value) -> Result<Value> {
        match command {
            commands::LOGIN => {
                let a: LoginArgs = decode_args(command, payload)?;
                info!("Attempting login with provider: {:?}", a.provider);
                let out = self
                    .run(command, &args::login(a.provider, a.use_device_code), "Login failed")
                    .await?;
                info!("Login successful");
                Ok(Value::String(out))
            }
            commands::LOGOUT => {
                self.run(command, &args_of(&["user", "logout"]), "Logout failed")
                    .await?;
                info!("Logged out");
                Ok(Value::String("Logged out successfully".into()))
            }
            commands::GET_USER_INFO => {
                let out = self
                    .run(command, &args_of(&["user", "show"]), "Not logged in")
                    .await?;
                let user = parser::parse_user_info(&out)
                    .ok_or_else(|| failure(command, "Not logged in"))?;
                encode(&user)
            }

            commands::CREATE_TUNNEL => {
                let a: ReqArgs<CreateTunnelRequest> = decode_args(command, payload)?;
                let out = self
                    .run(command, &args::create_tunnel(&a.req), "Failed to create tunnel")
                    .await?;
                info!("Tunnel created");
                Ok(Value::String(out))
            }
            commands::LIST_TUNNELS_LIGHT => {
                let a: OptionalReqArgs<ListTunnelsRequest> = decode_args(command, payload)?;
                encode(&self.list_tunnels(command, a.req.as_ref()).await?)
            }
            commands::LIST_TUNNELS => {
                let a: OptionalReqArgs<ListTunnelsRequest> = decode_args(command, payload)?;
                let mut tunnels = self.list_tunnels(command, a.req.as_ref()).await?;
                self.fill_port_numbers(&mut tunnels).await;
                encode(&tunnels)
            }
            commands::SHOW_TUNNEL => {
                let a: OptionalTunnelArgs = decode_args(command, payload)?;
                let out = self
                    .run(
                        command,
                        &args::show_tunnel(a.tunnel_id.as_deref()),
                        "Failed to show tunnel",
                    )
                    .await?;
                Ok(Value::String(out))
            }
            commands::UPDATE_TUNNEL => {
                let a: ReqArgs<UpdateTunnelRequest> = decode_args(command, payload)?;
                let out = self
                    .run(command, &args::update_tunnel(&a.req), "Failed to update tunnel")
                    .await?;
                Ok(Value::String(out))
            }
            commands::DELETE_TUNNEL => {
                let a: TunnelArgs = decode_args(command, payload)?;
                self.run(command, &args::delete_tunnel(&a.tunnel_id), "Failed to delete tunnel")
                    .await?;
                info!("Tunnel {} deleted", a.tunnel_id);
                Ok(Value::String("Tunnel deleted successfully".into()))
            }
            commands::DELETE_ALL_TUNNELS => {
                self.run(command, &args_of(&["delete-all"]), "Failed to delete all tunnels")
                    .await?;
                info!("All tunnels deleted");
                Ok(Value::String("All tunnels deleted successfully".into()))
            }
            commands::HOST_TUNNEL => {
                let a: ReqArgs<HostTunnelRequest> = decode_args(command, payload)?;
                encode(&self.host(command, &a.req).await?)
            }
            commands::STOP_TUNNEL => {
                let a: TunnelArgs = decode_args(command, payload)?;
                let message = process::stop_host(&a.tunnel_id)
                    .await
                    .map_err(|m| failure(command, m))?;
                info!("{}", message);
                Ok(Value::String(message))
            }
            commands::RESTART_TUNNEL => {
                let a: ReqArgs<HostTunnelRequest> = decode_args(command, payload)?;
                let id = a
                    .req
                    .tunnel_id
                    .clone()
                    .ok_or_else(|| failure(command, "Tunnel ID is required for restart"))?;
                if let Err(e) = process::stop_host(&id).await {
                    warn!("Stopping {} before restart failed: {}", id, e);
                }
                tokio::time::sleep(process::RESTART_PAUSE).await;
                self.host(command, &a.req).await?;
                Ok(Value::String(format!("Tunnel {} restarted successfully", id)))
            }
            commands::GET_TUNNEL_START_TIME => {
                let a: TunnelArgs = decode_args(command, payload)?;
                let started = process::host_start_time(&a.tunnel_id)
                    .await
                    .map_err(|m| failure(command, m))?;
                Ok(Value::String(started))
            }

            commands::CREATE_PORT => {
                let a: ReqArgs<CreatePortRequest> = decode_args(command, payload)?;
                let out = self
                    .run(command, &args::create_port(&a.req), "Failed to create port")
                    .await?;
                info!("Port {} created on {}", a.req.port_number, a.req.tunnel_id);
                Ok(Value::String(out))
            }
            commands::LIST_PORTS => {
                let a: TunnelArgs = decode_args(command, payload)?;
                let out = self
                    .run(command, &args::list_ports(&a.tunnel_id), "Failed to list ports")
                    .await?;
                encode(&decode_port_list(&a.tunnel_id, &out))
            }
            commands::SHOW_PORT => {
                let a: PortArgs = decode_args(command, payload)?;
                encode(&self.show_port(command, &a.tunnel_id, a.port_number).await?)
            }
            commands::UPDATE_PORT => {
                let a: ReqArgs<UpdatePortRequest> = decode_args(command, payload)?;
                Ok(Value::String(self.update_port(command, &a.req).await?))
            }
            commands::DELETE_PORT => {
                let a: PortArgs = decode_args(command, payload)?;
                self.run(
                    command,
                    &args::delete_port(&a.tunnel_id, a.port_number),
                    "Failed to delete port",
                )
                .await?;
                Ok(Value::String("Port deleted successfully".into()))
            }
            commands::PING_PORT => {
                let a: UrlArgs = decode_args(command, payload)?;
                info!("Pinging port: {}", a.url);
                encode(&process::ping(&self.http, &a.url).await)
            }

            commands::CREATE_ACCESS => {
                let a: ReqArgs<CreateAccessRequest> = decode_args(command, payload)?;
                let out = self
                    .run(command, &args::create_access(&a.req), "Failed to create access")
                    .await?;
                Ok(Value::String(out))
            }
            commands::LIST_ACCESS => {
                let a: TunnelArgs = decode_args(command, payload)?;
                let out = self
                    .run(command, &args::access("list", &a.tunnel_id), "Failed to list access")
                    .await?;
                Ok(Value::String(out))
            }
            commands::RESET_ACCESS => {
                let a: TunnelArgs = decode_args(command, payload)?;
                self.run(command, &args::access("reset", &a.tunnel_id), "Failed to reset access")
                    .await?;
                Ok(Value::String("Access reset successfully".into()))
            }

            commands::LIST_CLUSTERS => {
                let a: ClusterArgs = decode_args(command, payload)?;
                let out = self
                    .run(command, &args::list_clusters(a.ping), "Failed to list clusters")
                    .await?;
                let clusters: Vec<Cluster> = serde_json::from_str(&out).unwrap_or_else(|e| {
                    warn!("Failed to parse clusters JSON: {}", e);
                    Vec::new()
                });
                encode(&clusters)
            }
            commands::CHECK_INSTALLATION => {
                encode(&process::check_installation(&self.binary).await)
            }
            commands::OPEN_URL => {
                let a: UrlArgs = decode_args(command, payload)?;
                let message = process::open_url(&a.url).map_err(|m| failure(command, m))?;
                Ok(Value::String(message))
            }

            other => Err(failure(other, format!("Unknown command '{}'", other))),
        }
    }

    async fn list_tunnels(
        &self,
        command: &str,
        req: Option<&ListTunnelsRequest>,
    ) -> Result<Vec<TunnelSummary>> {
        let out = self
            .run(command, &args::list_tunnels(req), "Failed to list tunnels")
            .await?;
        Ok(parser::parse_tunnel_list(&out, Utc::now()))
    }

    /// The listing only carries port counts; read each tunnel's detail text
    /// concurrently for the numbers. Tunnels whose detail fails keep no ports.
    async fn fill_port_numbers(&self, tunnels: &mut [TunnelSummary]) {
        let details = join_all(tunnels.iter().map(|t| {
            let show = args::show_tunnel(Some(&t.tunnel_id));
            async move {
                self.run(commands::SHOW_TUNNEL, &show, "Failed to show tunnel")
                    .await
            }
        }))
        .await;

        for (tunnel, detail) in tunnels.iter_mut().zip(details) {
            match detail {
                Ok(text) => {
                    tunnel.ports = parser::parse_ports(&text).iter().map(|p| p.port).collect();
                }
                Err(e) => warn!("Failed to fetch details for {}: {}", tunnel.tunnel_id, e),
            }
        }
    }

    async fn host(&self, command: &str, req: &HostTunnelRequest) -> Result<String> {
        let label = req.tunnel_id.as_deref().unwrap_or("(new)");
        info!("Hosting tunnel {}", label);
        process::spawn_host(&self.binary, &args::host_tunnel(req))
            .await
            .map_err(|m| failure(command, m))?;
        Ok(format!("Tunnel {} is being hosted", label))
    }

    async fn show_port(&self, command: &str, tunnel_id: &str, port_number: u16) -> Result<Port> {
        let out = self
            .run(
                command,
                &args::show_port(tunnel_id, port_number),
                "Failed to show port",
            )
            .await?;
        parser::parse_port_show(&out).ok_or_else(|| failure(command, "Failed to parse port details"))
    }

    /// devtunnel cannot change a port's protocol in place; a protocol change
    /// deletes the port and creates it again.
    async fn update_port(&self, command: &str, req: &UpdatePortRequest) -> Result<String> {
        if let Some(protocol) = req.protocol {
            let current = self.show_port(command, &req.tunnel_id, req.port_number).await;
            if let Ok(current) = current
                && current.protocol != protocol
            {
                info!(
                    "Recreating port {} on {} with protocol {}",
                    req.port_number, req.tunnel_id, protocol
                );
                self.run(
                    command,
                    &args::delete_port(&req.tunnel_id, req.port_number),
                    "Failed to delete port",
                )
                .await?;
                let recreate = CreatePortRequest {
                    tunnel_id: req.tunnel_id.clone(),
                    port_number: req.port_number,
                    protocol: Some(protocol),
                    description: req.description.clone().or(current.description),
                };
                return self
                    .run(command, &args::create_port(&recreate), "Failed to create port")
                    .await;
            }
        }

        self.run(
            command,
            &args::update_port_description(req),
            "Failed to update port",
        )
        .await
    }
}

#[async_trait]
impl CommandBridge for DevTunnelBridge {
    async fn invoke(&self, command: &str, args: Value) -> CommandResponse<Value> {
        match self.dispatch(command, args).await {
            Ok(data) => CommandResponse::success(data),
            Err(e) => {
                debug!("{} failed: {}", command, e);
                CommandResponse::error(e.to_string())
            }
        }
    }
}

/// `port list -j` prints either a bare array or `{ "ports": [...] }`.
fn decode_port_list(tunnel_id: &str, output: &str) -> Vec<Port> {
    #[derive(Deserialize)]
    struct Wrapped {
        ports: Vec<Port>,
    }

    serde_json::from_str::<Vec<Port>>(output)
        .or_else(|_| serde_json::from_str::<Wrapped>(output).map(|w| w.ports))
        .unwrap_or_else(|e| {
            warn!("Failed to parse ports JSON for tunnel {}: {}", tunnel_id, e);
            Vec::new()
        })
}

fn failure(command: &str, message: impl Into<String>) -> Error {
    CommandError::Failed {
        command: command.to_string(),
        message: message.into(),
    }
    .into()
}

fn decode_args<T: DeserializeOwned>(command: &str, payload: Value) -> Result<T> {
    // Commands without arguments may be invoked with `null`
    let payload = if payload.is_null() {
        Value::Object(Default::default())
    } else {
        payload
    };
    serde_json::from_value(payload)
        .map_err(|e| failure(command, format!("Invalid arguments for '{}': {}", command, e)))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn args_of(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginArgs {
    provider: AuthProvider,
    #[serde(default)]
    use_device_code: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TunnelArgs {
    tunnel_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionalTunnelArgs {
    #[serde(default)]
    tunnel_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortArgs {
    tunnel_id: String,
    port_number: u16,
}

#[derive(Deserialize)]
struct ReqArgs<T> {
    req: T,
}

#[derive(Deserialize)]
struct OptionalReqArgs<T> {
    req: Option<T>,
}

#[derive(Deserialize)]
struct UrlArgs {
    url: String,
}

#[derive(Deserialize)]
struct ClusterArgs {
    #[serde(default)]
    ping: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_binary_resolution_order() {
        assert_eq!(
            resolve_binary_with(Some("/opt/devtunnel"), Some("/env/devtunnel".into())),
            "/opt/devtunnel"
        );
        assert_eq!(
            resolve_binary_with(None, Some("/env/devtunnel".into())),
            "/env/devtunnel"
        );
        assert_eq!(resolve_binary_with(Some("  "), None), "devtunnel");
        assert_eq!(resolve_binary_with(None, None), "devtunnel");
    }

    #[test]
    fn test_decode_port_list_shapes() {
        let bare = r#"[{"portNumber": 3000, "protocol": "https"}]"#;
        assert_eq!(decode_port_list("t1", bare)[0].port_number, 3000);

        let wrapped = r#"{"ports": [{"portNumber": 8080}]}"#;
        assert_eq!(decode_port_list("t1", wrapped)[0].port_number, 8080);

        assert!(decode_port_list("t1", "not json").is_empty());
    }

    #[tokio::test]
    async fn test_unknown_command_fails_in_envelope() {
        let bridge = DevTunnelBridge::new("devtunnel").unwrap();
        let resp = bridge.invoke("format_disk", json!({})).await;
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Unknown command 'format_disk'"));
    }

    #[tokio::test]
    async fn test_bad_arguments_fail_in_envelope() {
        let bridge = DevTunnelBridge::new("devtunnel").unwrap();
        let resp = bridge.invoke(commands::SHOW_PORT, json!({"tunnelId": "t1"})).await;
        assert!(!resp.success);
        assert!(resp.error.unwrap().starts_with("Invalid arguments for 'show_port'"));
    }

    #[tokio::test]
    async fn test_missing_binary_reported_in_envelope() {
        let bridge = DevTunnelBridge::new("/nonexistent/dir/devtunnel").unwrap();
        let resp = bridge
            .invoke(commands::SHOW_TUNNEL, json!({"tunnelId": "t1"}))
            .await;
        assert!(!resp.success);
        assert!(resp.error.unwrap().starts_with("Failed to show tunnel: could not run"));
    }

    #[tokio::test]
    async fn test_installation_check_never_fails() {
        let bridge = DevTunnelBridge::new("/nonexistent/dir/devtunnel").unwrap();
        let resp = bridge.invoke(commands::CHECK_INSTALLATION, Value::Null).await;
        assert!(resp.success);
        assert_eq!(resp.data.unwrap()["installed"], false);
    }
}
