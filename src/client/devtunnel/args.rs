//! devtunnel argv construction
//!
//! Each builder returns the arguments that follow the binary name, so the
//! mapping from request to command line can be tested without spawning.

use crate::client::models::{
    AccessEntryType, AuthProvider, CreateAccessRequest, CreatePortRequest, CreateTunnelRequest,
    HostTunnelRequest, ListTunnelsRequest, UpdatePortRequest, UpdateTunnelRequest,
};

pub fn login(provider: AuthProvider, use_device_code: bool) -> Vec<String> {
    let mut args = argv(&["user", "login"]);
    if provider == AuthProvider::GitHub {
        args.push("-g".into());
    }
    if use_device_code {
        args.push("-d".into());
    }
    args
}

pub fn create_tunnel(req: &CreateTunnelRequest) -> Vec<String> {
    let mut args = argv(&["create"]);
    if let Some(id) = &req.tunnel_id {
        args.push(id.clone());
    }
    if req.allow_anonymous.unwrap_or(false) {
        args.push("-a".into());
    }
    if let Some(description) = &req.description {
        args.extend(["-d".into(), description.clone()]);
    }
    push_tags(&mut args, "--tags", req.tags.as_deref());
    if let Some(expiration) = &req.expiration {
        args.extend(["--expiration".into(), expiration.clone()]);
    }
    args
}

pub fn list_tunnels(req: Option<&ListTunnelsRequest>) -> Vec<String> {
    let mut args = argv(&["list"]);
    if let Some(req) = req {
        let flag = if req.all_tags.unwrap_or(false) {
            "--all-tags"
        } else {
            "--tags"
        };
        push_tags(&mut args, flag, req.tags.as_deref());
    }
    args
}

pub fn show_tunnel(tunnel_id: Option<&str>) -> Vec<String> {
    let mut args = argv(&["show"]);
    if let Some(id) = tunnel_id {
        args.push(id.to_string());
    }
    args
}

pub fn update_tunnel(req: &UpdateTunnelRequest) -> Vec<String> {
    let mut args = vec!["update".to_string(), req.tunnel_id.clone()];
    if let Some(description) = &req.description {
        args.extend(["-d".into(), description.clone()]);
    }
    if req.remove_tags.unwrap_or(false) {
        args.push("--remove-tags".into());
    } else {
        push_tags(&mut args, "--tags", req.tags.as_deref());
    }
    if let Some(expiration) = &req.expiration {
        args.extend(["--expiration".into(), expiration.clone()]);
    }
    args
}

pub fn delete_tunnel(tunnel_id: &str) -> Vec<String> {
    vec!["delete".into(), tunnel_id.to_string()]
}

/// `host` without `-p`: ports are created before hosting, and devtunnel
/// rejects batch port updates on an existing tunnel.
pub fn host_tunnel(req: &HostTunnelRequest) -> Vec<String> {
    let mut args = argv(&["host"]);
    if let Some(id) = &req.tunnel_id {
        args.push(id.clone());
    }
    if req.allow_anonymous.unwrap_or(false) {
        args.push("--allow-anonymous".into());
    }
    if let Some(expiration) = &req.expiration {
        args.extend(["--expiration".into(), expiration.clone()]);
    }
    args
}

pub fn create_port(req: &CreatePortRequest) -> Vec<String> {
    let mut args = port_target("create", &req.tunnel_id, req.port_number);
    if let Some(protocol) = req.protocol {
        args.extend(["--protocol".into(), protocol.to_string()]);
    }
    if let Some(description) = &req.description {
        args.extend(["--description".into(), description.clone()]);
    }
    args
}

pub fn list_ports(tunnel_id: &str) -> Vec<String> {
    vec!["port".into(), "list".into(), tunnel_id.to_string(), "-j".into()]
}

pub fn show_port(tunnel_id: &str, port_number: u16) -> Vec<String> {
    vec![
        "port".into(),
        "show".into(),
        tunnel_id.to_string(),
        "--port-number".into(),
        port_number.to_string(),
    ]
}

pub fn update_port_description(req: &UpdatePortRequest) -> Vec<String> {
    let mut args = port_target("update", &req.tunnel_id, req.port_number);
    if let Some(description) = &req.description {
        args.extend(["--description".into(), description.clone()]);
    }
    args
}

pub fn delete_port(tunnel_id: &str, port_number: u16) -> Vec<String> {
    port_target("delete", tunnel_id, port_number)
}

pub fn create_access(req: &CreateAccessRequest) -> Vec<String> {
    let mut args = vec!["access".into(), "create".into(), req.tunnel_id.clone()];
    let entry = &req.entry;

    match entry.entry_type {
        AccessEntryType::Anonymous => args.push("--anonymous".into()),
        AccessEntryType::Organization => {
            if let Some(org) = &entry.organization_id {
                args.extend(["--org".into(), org.clone()]);
            }
        }
        AccessEntryType::User | AccessEntryType::Tenant => {}
    }

    for port in entry.ports.iter().flatten() {
        args.extend(["-p".into(), port.to_string()]);
    }
    if let Some(expiration) = &entry.expiration {
        args.extend(["--expiration".into(), expiration.clone()]);
    }
    args
}

pub fn access(action: &str, tunnel_id: &str) -> Vec<String> {
    vec!["access".into(), action.to_string(), tunnel_id.to_string()]
}

pub fn list_clusters(ping: bool) -> Vec<String> {
    let mut args = argv(&["clusters", "-j"]);
    if ping {
        args.push("--ping".into());
    }
    args
}

fn port_target(action: &str, tunnel_id: &str, port_number: u16) -> Vec<String> {
    vec![
        "port".into(),
        action.to_string(),
        tunnel_id.to_string(),
        "-p".into(),
        port_number.to_string(),
    ]
}

fn push_tags(args: &mut Vec<String>, flag: &str, tags: Option<&[String]>) {
    if let Some(tags) = tags.filter(|t| !t.is_empty()) {
        args.push(flag.to_string());
        args.extend(tags.iter().cloned());
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
