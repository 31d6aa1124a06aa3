//! Entity cache store
//!
//! Every read checks freshness, evicts a stale entry and returns in one
//! synchronous call, so no other task can observe a half-evicted entry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;

use super::{CACHE_TTL, CachedEntry, Clock, SystemClock};
use crate::client::models::{InstallationInfo, TunnelSummary};

/// Addressable cache slots, used for invalidation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The full tunnel inventory
    TunnelList,
    /// Raw detail text of one tunnel
    TunnelDetail(String),
    /// devtunnel installation info
    Installation,
}

/// Invalidation count of one slot, captured before a remote read.
///
/// Any invalidation touching the slot after the capture makes the
/// conditional setters drop the late result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch {
    generation: u64,
    category: u64,
    key: u64,
}

/// Process-wide store for remote data that is fresh enough to reuse
pub struct EntityCache<C: Clock = SystemClock> {
    clock: C,
    ttl: Duration,
    tunnels: Option<CachedEntry<Vec<TunnelSummary>>>,
    details: HashMap<String, CachedEntry<String>>,
    installation: Option<CachedEntry<InstallationInfo>>,
    generation: u64,
    list_epoch: u64,
    installation_epoch: u64,
    /// Bumped when every detail is dropped at once
    details_epoch: u64,
    detail_epochs: HashMap<String, u64>,
}

impl Default for EntityCache<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> EntityCache<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            ttl: CACHE_TTL,
            tunnels: None,
            details: HashMap::new(),
            installation: None,
            generation: 0,
            list_epoch: 0,
            installation_epoch: 0,
            details_epoch: 0,
            detail_epochs: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Bumped by every full clear; part of every [`Epoch`]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current invalidation count of the slot behind `key`
    pub fn epoch(&self, key: &CacheKey) -> Epoch {
        let (category, key) = match key {
            CacheKey::TunnelList => (self.list_epoch, 0),
            CacheKey::TunnelDetail(id) => (
                self.details_epoch,
                self.detail_epochs.get(id).copied().unwrap_or(0),
            ),
            CacheKey::Installation => (self.installation_epoch, 0),
        };
        Epoch {
            generation: self.generation,
            category,
            key,
        }
    }

    // ------------------------------------------------------------------
    // Tunnel list
    // ------------------------------------------------------------------

    /// Cached tunnel list, or `None` (evicting it) when absent or stale
    pub fn tunnels(&mut self) -> Option<Vec<TunnelSummary>> {
        let now = self.clock.now();
        take_fresh(&mut self.tunnels, now, self.ttl, "tunnel list")
    }

    pub fn set_tunnels(&mut self, tunnels: Vec<TunnelSummary>) {
        self.tunnels = Some(CachedEntry::new(tunnels, self.clock.now()));
    }

    /// Store the list only if nothing invalidated it since `epoch` was taken
    pub fn set_tunnels_if(&mut self, epoch: Epoch, tunnels: Vec<TunnelSummary>) -> bool {
        if self.epoch(&CacheKey::TunnelList) != epoch {
            debug!("Cache skip: tunnel list invalidated during fetch");
            return false;
        }
        self.set_tunnels(tunnels);
        true
    }

    /// Whether a list read would hit, without evicting anything
    pub fn is_tunnel_list_fresh(&self) -> bool {
        let now = self.clock.now();
        self.tunnels
            .as_ref()
            .is_some_and(|entry| entry.is_fresh(now, self.ttl))
    }

    // ------------------------------------------------------------------
    // Tunnel details
    // ------------------------------------------------------------------

    /// Cached detail text for `tunnel_id`, or `None` (evicting it) when absent or stale
    pub fn tunnel_detail(&mut self, tunnel_id: &str) -> Option<String> {
        let now = self.clock.now();
        let entry = self.details.get(tunnel_id)?;

        if entry.is_fresh(now, self.ttl) {
            debug!("Cache hit: tunnel detail {}", tunnel_id);
            return Some(entry.data.clone());
        }

        debug!(
            "Cache expired: tunnel detail {} (age {:?})",
            tunnel_id,
            entry.age(now)
        );
        self.details.remove(tunnel_id);
        None
    }

    pub fn set_tunnel_detail(&mut self, tunnel_id: &str, detail: String) {
        self.details.insert(
            tunnel_id.to_string(),
            CachedEntry::new(detail, self.clock.now()),
        );
    }

    /// Store the detail only if nothing invalidated it since `epoch` was taken
    pub fn set_tunnel_detail_if(
        &mut self,
        epoch: Epoch,
        tunnel_id: &str,
        detail: String,
    ) -> bool {
        if self.epoch(&CacheKey::TunnelDetail(tunnel_id.to_string())) != epoch {
            debug!(
                "Cache skip: tunnel detail {} invalidated during fetch",
                tunnel_id
            );
            return false;
        }
        self.set_tunnel_detail(tunnel_id, detail);
        true
    }

    // ------------------------------------------------------------------
    // Installation info
    // ------------------------------------------------------------------

    /// Cached installation info, or `None` (evicting it) when absent or stale
    pub fn installation(&mut self) -> Option<InstallationInfo> {
        let now = self.clock.now();
        take_fresh(&mut self.installation, now, self.ttl, "installation info")
    }

    pub fn set_installation(&mut self, info: InstallationInfo) {
        self.installation = Some(CachedEntry::new(info, self.clock.now()));
    }

    /// Store installation info only if nothing invalidated it since `epoch` was taken
    pub fn set_installation_if(&mut self, epoch: Epoch, info: InstallationInfo) -> bool {
        if self.epoch(&CacheKey::Installation) != epoch {
            debug!("Cache skip: installation info invalidated during fetch");
            return false;
        }
        self.set_installation(info);
        true
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Remove one entry regardless of freshness and bump its epoch.
    ///
    /// Returns whether an entry was present.
    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        debug!("Cache invalidate: {:?}", key);
        match key {
            CacheKey::TunnelList => {
                self.list_epoch += 1;
                self.tunnels.take().is_some()
            }
            CacheKey::TunnelDetail(id) => {
                *self.detail_epochs.entry(id.clone()).or_insert(0) += 1;
                self.details.remove(id).is_some()
            }
            CacheKey::Installation => {
                self.installation_epoch += 1;
                self.installation.take().is_some()
            }
        }
    }

    /// Remove every tunnel detail entry, keeping the list and installation info
    pub fn invalidate_all_details(&mut self) -> usize {
        let removed = self.details.len();
        self.details_epoch += 1;
        self.detail_epochs.clear();
        self.details.clear();
        removed
    }

    /// Clear every cache category
    pub fn invalidate_all(&mut self) {
        debug!("Cache cleared");
        self.generation += 1;
        self.detail_epochs.clear();
        self.tunnels = None;
        self.details.clear();
        self.installation = None;
    }

    /// Session teardown: nothing cached under the old session survives
    pub fn reset(&mut self) {
        self.invalidate_all();
    }

    /// Snapshot of what is cached and how much of it is still fresh
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let valid_details = self
            .details
            .values()
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .count();
        let oldest_age = self
            .details
            .values()
            .map(|entry| entry.timestamp)
            .chain(self.tunnels.as_ref().map(|entry| entry.timestamp))
            .chain(self.installation.as_ref().map(|entry| entry.timestamp))
            .min()
            .map(|ts| now.saturating_duration_since(ts));

        CacheStats {
            tunnel_list_cached: self.tunnels.is_some(),
            tunnel_list_fresh: self.is_tunnel_list_fresh(),
            detail_entries: self.details.len(),
            valid_detail_entries: valid_details,
            installation_cached: self.installation.is_some(),
            oldest_entry_age: oldest_age,
        }
    }
}

/// Statistics about cache state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub tunnel_list_cached: bool,
    pub tunnel_list_fresh: bool,
    pub detail_entries: usize,
    pub valid_detail_entries: usize,
    pub installation_cached: bool,
    pub oldest_entry_age: Option<Duration>,
}

fn take_fresh<T: Clone>(
    slot: &mut Option<CachedEntry<T>>,
    now: Instant,
    ttl: Duration,
    label: &str,
) -> Option<T> {
    let entry = slot.as_ref()?;
    if entry.is_fresh(now, ttl) {
        debug!("Cache hit: {}", label);
        return Some(entry.data.clone());
    }

    debug!("Cache expired: {} (age {:?})", label, entry.age(now));
    *slot = None;
    None
}
