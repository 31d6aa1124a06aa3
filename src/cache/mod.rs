//! In-memory entity cache with time-based invalidation
//!
//! Holds the tunnel list, per-tunnel detail text and the installation info.
//! Freshness is judged against an injectable [`Clock`] so expiry can be tested
//! without real delays. Nothing is persisted; the cache lives as long as the
//! process.

pub mod store;

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Freshness window shared by every cache category
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60); // 5 min

/// Time source for freshness checks
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic expiry tests
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut offset = self
            .offset
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *offset += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self
            .offset
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        self.origin + offset
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// A cached value and the instant it was stored
#[derive(Debug, Clone)]
pub struct CachedEntry<T> {
    pub data: T,
    pub timestamp: Instant,
}

impl<T> CachedEntry<T> {
    pub fn new(data: T, timestamp: Instant) -> Self {
        Self { data, timestamp }
    }

    /// Valid iff `now - timestamp < ttl`
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.timestamp) < ttl
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timestamp)
    }
}

// Re-export main types
pub use store::{CacheKey, CacheStats, EntityCache, Epoch};
