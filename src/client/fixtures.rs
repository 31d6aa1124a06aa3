//! Sample devtunnel CLI output for tests

/// `devtunnel show` for a hosted tunnel with two ports, one forwarded
pub const SHOW_HOSTED: &str = "\
Tunnel ID             : bright-fox.usw2
Description           : demo backend
Labels                : web
Access control        : {+Anonymous [connect]}
Host connections      : 1
Client connections    : 0
Current upload rate   : 0 MB/s (limit: 20 MB/s)
Current download rate : 0 MB/s (limit: 20 MB/s)
Ports                 : 2
  8080  http   https://bright-fox-8080.usw2.devtunnels.ms/
  3000  https
Tunnel Expiration     : 30 days
";

/// `devtunnel show` for a tunnel that is not being hosted
pub const SHOW_IDLE: &str = "\
Tunnel ID             : quiet-owl.euw
Description           :
Labels                :
Access control        : {}
Host connections      : 0
Client connections    : 0
Ports                 : 1
  5173  auto
Tunnel Expiration     : 29 days
";

/// `devtunnel show` for a tunnel without ports
pub const SHOW_NO_PORTS: &str = "\
Tunnel ID             : empty-cat.usw2
Host connections      : 0
Ports                 : 0
Tunnel Expiration     : 30 days
";

/// `devtunnel list` with two tunnels
pub const LIST_TWO: &str = "\
Found 2 tunnels.

Tunnel ID                           Host Connections     Labels                    Ports                Expiration                Description
bright-fox.usw2                     1                    web                       2                    30 days                   demo backend
quiet-owl.euw                       0                                              1                    1 day
";

/// `devtunnel port show`
pub const PORT_SHOW: &str = "\
Tunnel ID             : bright-fox.usw2
Port Number           : 8080
Protocol              : http
Description           : api server
Access control        : {Inherited: +Anonymous [connect]}
Client connections    : 0
";

/// `devtunnel user show` when signed in
pub const USER_SHOW_GITHUB: &str = "Logged in as octo-dev using GitHub.\n";
