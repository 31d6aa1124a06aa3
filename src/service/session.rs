//! Session health policy

use std::time::{Duration, Instant};

use log::debug;

use super::TunnelService;
use crate::cache::Clock;
use crate::client::CommandBridge;
use crate::client::models::UserInfo;
use crate::error::Result;

/// Interval between background identity checks
pub const PERIODIC_CHECK_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60); // 2 hours

/// Minimum age of the last check before a focus/resume triggers another
pub const RESUME_CHECK_THRESHOLD: Duration = Duration::from_secs(30 * 60); // 30 min

/// Decides when the signed-in identity should be verified again
#[derive(Debug, Clone)]
pub struct SessionMonitor {
    last_check: Option<Instant>,
    periodic: Duration,
    resume_threshold: Duration,
}

impl Default for SessionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMonitor {
    pub fn new() -> Self {
        Self {
            last_check: None,
            periodic: PERIODIC_CHECK_INTERVAL,
            resume_threshold: RESUME_CHECK_THRESHOLD,
        }
    }

    pub fn last_check(&self) -> Option<Instant> {
        self.last_check
    }

    /// On focus or resume: check when never checked or the last check is stale
    pub fn needs_check(&self, now: Instant) -> bool {
        self.elapsed_exceeds(now, self.resume_threshold)
    }

    /// Periodic tick: check once the full interval has passed
    pub fn periodic_due(&self, now: Instant) -> bool {
        self.elapsed_exceeds(now, self.periodic)
    }

    pub fn record_check(&mut self, at: Instant) {
        self.last_check = Some(at);
    }

    fn elapsed_exceeds(&self, now: Instant, limit: Duration) -> bool {
        match self.last_check {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= limit,
        }
    }
}

impl<B: CommandBridge, C: Clock> TunnelService<B, C> {
    /// Verify the session when `monitor` says a check is due on resume.
    ///
    /// Returns `Ok(None)` when no check was needed. A failed check resets the
    /// store and yields [`crate::Error::SessionExpired`].
    pub async fn check_session_on_resume(
        &self,
        monitor: &mut SessionMonitor,
        now: Instant,
    ) -> Result<Option<UserInfo>> {
        if !monitor.needs_check(now) {
            debug!("Session checked recently, skipping");
            return Ok(None);
        }

        let user = self.verify_session().await?;
        monitor.record_check(now);
        Ok(Some(user))
    }
}
