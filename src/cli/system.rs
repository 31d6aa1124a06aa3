//! Cluster, installation, browser and session watch commands

use std::time::{Duration, Instant};

use chrono::Utc;
use colored::Colorize;
use log::info;
use tabled::Tabled;
use tokio::time::MissedTickBehavior;

use tunnelsync::client::models::{Cluster, InstallationInfo, UserInfo};
use tunnelsync::service::SessionMonitor;
use tunnelsync::{Error, Result};

use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::output::{self, json, table};

/// Cluster for table display
#[derive(Tabled)]
struct ClusterDisplay {
    #[tabled(rename = "CLUSTER")]
    id: String,
    #[tabled(rename = "REGION")]
    region: String,
    #[tabled(rename = "LATENCY")]
    latency: String,
    #[tabled(rename = "URI")]
    uri: String,
}

impl From<&Cluster> for ClusterDisplay {
    fn from(cluster: &Cluster) -> Self {
        Self {
            id: cluster.cluster_id.clone(),
            region: table::or_dash(cluster.region.clone()),
            latency: table::or_dash(cluster.latency.map(|ms| format!("{} ms", ms))),
            uri: cluster.uri.clone(),
        }
    }
}

/// Run the cluster list command
pub async fn clusters(opts: &GlobalOptions, ping: bool) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let clusters = ctx.service.list_clusters(ping).await?;
    output::print_list::<_, ClusterDisplay>(ctx.format, &clusters)
}

/// Run the doctor command; fails when devtunnel cannot be found
pub async fn doctor(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let info = ctx.service.installation(false).await?;
    let binary = ctx.service.dispatcher().bridge().binary().to_string();

    match ctx.format {
        OutputFormat::Table => print_installation(&binary, &info),
        OutputFormat::Json => println!("{}", json::format_json(&info)?),
    }

    if info.installed {
        Ok(())
    } else {
        Err(Error::Other(format!("devtunnel not found ('{}')", binary)))
    }
}

fn print_installation(binary: &str, info: &InstallationInfo) {
    println!("{}\n", "devtunnel installation".bold());

    if info.installed {
        println!(
            "{} Installed at {}",
            "✓".green(),
            info.path.as_deref().unwrap_or(binary).cyan()
        );
        match &info.version {
            Some(version) => println!("  Version: {}", version),
            None => println!("  Version: {}", "unknown".dimmed()),
        }
    } else {
        println!("{} devtunnel is not installed", "✗".red());
        println!("  → Install it or set binary_path in the config file");
    }
}

/// Run the open command
pub async fn open(opts: &GlobalOptions, url: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let out = ctx.service.open_url(url).await?;
    output::print_message(ctx.format, &out)
}

/// Run the watch command: verify the session on a schedule until Ctrl-C.
///
/// A tick that arrives much later than scheduled is treated as a resume
/// from sleep and goes through the resume check instead of the periodic one.
/// Returns [`Error::SessionExpired`] as soon as a check fails.
pub async fn watch(opts: &GlobalOptions, interval_secs: u64) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let period = Duration::from_secs(interval_secs.max(1));

    let mut monitor = SessionMonitor::new();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Utc::now();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Stopped.");
                return Ok(());
            }
        }

        let wall = Utc::now();
        let now = Instant::now();
        let resumed = is_resume(wall - last_tick, period);
        last_tick = wall;

        let user = if resumed {
            info!("Resumed after a long pause, checking session");
            ctx.service.check_session_on_resume(&mut monitor, now).await?
        } else if monitor.periodic_due(now) {
            let user = ctx.service.verify_session().await?;
            monitor.record_check(now);
            Some(user)
        } else {
            None
        };

        if let Some(user) = user {
            report_check(ctx.format, &user)?;
        }
    }
}

/// Whether the wall-clock gap between two ticks means the machine slept
fn is_resume(gap: chrono::Duration, period: Duration) -> bool {
    gap.to_std().is_ok_and(|gap| gap > period * 2)
}

fn report_check(format: OutputFormat, user: &UserInfo) -> Result<()> {
    match format {
        OutputFormat::Table => println!(
            "{} {} Session valid for {}",
            Utc::now().format("%H:%M:%S").to_string().dimmed(),
            "✓".green(),
            user.display_name()
        ),
        OutputFormat::Json => println!("{}", json::format_json(user)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_resume() {
        let period = Duration::from_secs(60);
        assert!(!is_resume(chrono::Duration::seconds(61), period));
        assert!(!is_resume(chrono::Duration::seconds(120), period));
        assert!(is_resume(chrono::Duration::minutes(45), period));
        // Clock stepped backwards
        assert!(!is_resume(chrono::Duration::seconds(-30), period));
    }

    #[test]
    fn test_cluster_row() {
        let cluster = Cluster {
            cluster_id: "usw2".to_string(),
            uri: "https://usw2.rel.tunnels.api.visualstudio.com/".to_string(),
            region: Some("West US 2".to_string()),
            latency: Some(42),
        };

        let row = ClusterDisplay::from(&cluster);
        assert_eq!(row.latency, "42 ms");
        assert_eq!(row.region, "West US 2");
    }
}
