//! Hosting arguments shared by `tunnel host` and `tunnel restart`

use clap::Args;

use tunnelsync::client::models::{HostTunnelRequest, Protocol};
use tunnelsync::config::HostDefaults;

#[derive(Debug, Clone, Args, Default)]
pub struct HostArgs {
    /// Local port to forward (repeatable); only used for temporary tunnels
    #[arg(short = 'p', long = "port")]
    pub ports: Vec<u16>,

    /// Protocol for the forwarded ports (http, https, auto)
    #[arg(long)]
    pub protocol: Option<Protocol>,

    /// Allow anonymous clients
    #[arg(long, conflicts_with = "no_anonymous")]
    pub allow_anonymous: bool,

    /// Require authenticated clients, even if the config allows anonymous
    #[arg(long)]
    pub no_anonymous: bool,

    /// Tunnel expiration, e.g. 8h or 30d
    #[arg(long)]
    pub expiration: Option<String>,
}

impl HostArgs {
    /// Build a host request, filling unset flags from the config defaults
    pub fn into_request(self, tunnel_id: Option<String>, defaults: &HostDefaults) -> HostTunnelRequest {
        let allow_anonymous = if self.allow_anonymous {
            true
        } else if self.no_anonymous {
            false
        } else {
            defaults.allow_anonymous
        };

        HostTunnelRequest {
            tunnel_id,
            ports: self.ports,
            protocol: self.protocol,
            allow_anonymous: Some(allow_anonymous),
            expiration: self.expiration.or_else(|| defaults.expiration.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_fill_unset_flags() {
        let defaults = HostDefaults {
            allow_anonymous: true,
            expiration: Some("8h".to_string()),
        };

        let req = HostArgs::default().into_request(Some("t1".to_string()), &defaults);
        assert_eq!(req.allow_anonymous, Some(true));
        assert_eq!(req.expiration.as_deref(), Some("8h"));
    }

    #[test]
    fn test_flags_override_defaults() {
        let defaults = HostDefaults {
            allow_anonymous: true,
            expiration: Some("8h".to_string()),
        };
        let args = HostArgs {
            no_anonymous: true,
            expiration: Some("1d".to_string()),
            ..Default::default()
        };

        let req = args.into_request(None, &defaults);
        assert_eq!(req.allow_anonymous, Some(false));
        assert_eq!(req.expiration.as_deref(), Some("1d"));
        assert!(req.tunnel_id.is_none());
    }
}
