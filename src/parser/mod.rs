//! Tolerant parsers for devtunnel's human-readable output
//!
//! devtunnel prints most state as aligned text rather than JSON. Every parser
//! here is best-effort: unknown lines are skipped and a missing pattern yields
//! an empty or default result, never an error.

mod listing;
mod show;

pub use listing::{parse_port_show, parse_tunnel_list, parse_user_info};
pub use show::{host_connections, is_hosted, parse_ports};
