//! devtunnel data models
//!
//! Domain types exchanged with the command bridge. Field names serialize in
//! camelCase to match the argument and payload keys of the bridge envelope.

mod access;
mod auth;
mod port;
mod system;
mod tunnel;

pub use access::{
    AccessControlEntry, AccessEntryType, AccessPreset, AccessScope, CreateAccessRequest,
    access_presets,
};
pub use auth::{AuthProvider, UserInfo};
pub use port::{CreatePortRequest, PingResult, Port, PortRecord, UpdatePortRequest};
pub use system::{Cluster, InstallationInfo};
pub use tunnel::{
    CreateTunnelRequest, HostStatus, HostTunnelRequest, ListTunnelsRequest, Protocol,
    TunnelStatus, TunnelSummary, UpdateTunnelRequest,
};
