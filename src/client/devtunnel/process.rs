//! Host process control and local system helpers

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;

use crate::client::models::{InstallationInfo, PingResult};

/// Time a freshly spawned host process gets before it is judged alive
pub const HOST_START_GRACE: Duration = Duration::from_millis(1500);

/// Pause between stopping and re-hosting on restart
pub const RESTART_PAUSE: Duration = Duration::from_millis(500);

const PING_TIMEOUT: Duration = Duration::from_secs(5);

static TUNNEL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid regex"));

/// Reject ids that could act as a pattern or shell fragment in `pkill -f`
pub fn validate_tunnel_id(tunnel_id: &str) -> Result<(), String> {
    if TUNNEL_ID.is_match(tunnel_id) {
        Ok(())
    } else {
        Err(format!(
            "Invalid tunnel ID '{}': only letters, digits, dots, hyphens and underscores are allowed",
            tunnel_id
        ))
    }
}

/// Spawn `binary args..` detached from our stdio and check it survives the
/// start grace period. The child keeps running after this process exits.
pub async fn spawn_host(binary: &str, args: &[String]) -> Result<u32, String> {
    let mut child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("Failed to start devtunnel host: {}", e))?;

    tokio::time::sleep(HOST_START_GRACE).await;

    match child.try_wait() {
        Ok(Some(status)) => Err(format!(
            "devtunnel host exited immediately with status: {}",
            status
        )),
        Ok(None) => {
            let pid = child.id().unwrap_or_default();
            info!("devtunnel host running (pid {})", pid);
            Ok(pid)
        }
        Err(e) => Err(format!("Failed to check host process status: {}", e)),
    }
}

/// Kill the `devtunnel host <id>` process, if any.
///
/// A missing process is not an error; the message says which case applied.
pub async fn stop_host(tunnel_id: &str) -> Result<String, String> {
    validate_tunnel_id(tunnel_id)?;
    let pattern = format!("devtunnel host {}", tunnel_id);

    #[cfg(unix)]
    let output = Command::new("pkill").arg("-f").arg(&pattern).output().await;

    #[cfg(windows)]
    let output = Command::new("taskkill")
        .args(["/F", "/FI"])
        .arg(format!("COMMANDLINE eq *{}*", pattern))
        .output()
        .await;

    let output = output.map_err(|e| format!("Failed to stop host process: {}", e))?;

    // pkill exits 1 when nothing matched
    if output.status.success() {
        Ok(format!("Tunnel {} stopped successfully", tunnel_id))
    } else {
        Ok(format!("No active host process found for tunnel {}", tunnel_id))
    }
}

/// Start time of the host process for `tunnel_id`, as printed by `ps`.
pub async fn host_start_time(tunnel_id: &str) -> Result<String, String> {
    if !cfg!(unix) {
        return Err("Start time lookup is not supported on this platform".to_string());
    }

    let output = Command::new("ps")
        .args(["-eo", "pid,lstart,args"])
        .output()
        .await
        .map_err(|e| format!("Failed to read process list: {}", e))?;

    if !output.status.success() {
        return Err("Failed to read process list".to_string());
    }

    parse_start_time(&String::from_utf8_lossy(&output.stdout), tunnel_id)
        .ok_or_else(|| format!("No active host process found for tunnel {}", tunnel_id))
}

/// Find the `lstart` columns of the first host process line for `tunnel_id`.
///
/// ```text
///   PID                  STARTED COMMAND
/// 12345 Mon Jan 15 14:30:25 2024 /usr/local/bin/devtunnel host my-tunnel
/// ```
pub fn parse_start_time(ps_output: &str, tunnel_id: &str) -> Option<String> {
    ps_output
        .lines()
        .filter(|line| {
            line.contains("devtunnel") && line.contains("host") && line.contains(tunnel_id)
        })
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .find(|parts| parts.len() >= 6)
        .map(|parts| parts[1..6].join(" "))
}

/// Probe a forwarded URL. Transport failures are reported in the result.
pub async fn ping(http: &reqwest::Client, url: &str) -> PingResult {
    let started = Instant::now();
    let response = http.get(url).timeout(PING_TIMEOUT).send().await;
    let response_time_ms = started.elapsed().as_millis() as u64;

    match response {
        Ok(resp) => {
            let code = resp.status().as_u16();
            debug!("Ping {} -> {} in {}ms", url, code, response_time_ms);
            PingResult {
                success: code < 600,
                status_code: Some(code),
                response_time_ms,
                error: None,
            }
        }
        Err(e) => PingResult {
            success: false,
            status_code: None,
            response_time_ms,
            error: Some(e.to_string()),
        },
    }
}

/// Only http and https URLs may be handed to the system opener
pub fn validate_url(raw: &str) -> Result<url::Url, String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("Invalid URL format: {}", e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(format!(
            "Invalid URL scheme: {}. Only http/https are allowed.",
            other
        )),
    }
}

/// Open `raw` with the platform's default handler
pub fn open_url(raw: &str) -> Result<String, String> {
    let url = validate_url(raw)?;

    #[cfg(target_os = "macos")]
    let spawned = std::process::Command::new("open").arg(url.as_str()).spawn();

    #[cfg(windows)]
    let spawned = std::process::Command::new("cmd")
        .args(["/C", "start", url.as_str()])
        .spawn();

    #[cfg(all(unix, not(target_os = "macos")))]
    let spawned = std::process::Command::new("xdg-open").arg(url.as_str()).spawn();

    spawned
        .map(|_| "URL opened successfully".to_string())
        .map_err(|e| format!("Failed to open URL: {}", e))
}

/// Locate `binary` (a path, or a name looked up on `PATH`) and read its version.
pub async fn check_installation(binary: &str) -> InstallationInfo {
    let Some(path) = locate(binary) else {
        return InstallationInfo {
            installed: false,
            path: None,
            version: None,
        };
    };

    let version = Command::new(&path)
        .arg("--version")
        .output()
        .await
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| {
            String::from_utf8_lossy(&o.stdout)
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .map(str::to_string)
        });

    InstallationInfo {
        installed: true,
        path: Some(path.display().to_string()),
        version,
    }
}

fn locate(binary: &str) -> Option<PathBuf> {
    let candidate = Path::new(binary);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .flat_map(|dir| executable_names(binary).into_iter().map(move |n| dir.join(n)))
        .find(|p| p.is_file())
}

fn executable_names(binary: &str) -> Vec<String> {
    if cfg!(windows) {
        vec![format!("{}.exe", binary), binary.to_string()]
    } else {
        vec![binary.to_string()]
    }
}
