//! Cache-aware tunnel operations
//!
//! [`TunnelService`] is what front-ends call. Reads go through the retrying
//! dispatcher and populate the [`EntityCache`]; mutations are sent once and
//! then invalidate exactly the entries they can have changed.

mod ports;
mod session;

pub use ports::dedup_last_wins;
pub use session::SessionMonitor;

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use serde_json::json;

use crate::cache::{CacheKey, CacheStats, Clock, EntityCache, SystemClock};
use crate::client::models::{
    AuthProvider, Cluster, CreateAccessRequest, CreatePortRequest, CreateTunnelRequest,
    HostStatus, HostTunnelRequest, InstallationInfo, ListTunnelsRequest, PingResult, Port,
    TunnelSummary, UpdatePortRequest, UpdateTunnelRequest, UserInfo,
};
use crate::client::{CommandBridge, Dispatcher, commands};
use crate::error::{Error, Result};
use crate::parser;

/// Tunnel operations backed by a command bridge and an entity cache
pub struct TunnelService<B: CommandBridge, C: Clock = SystemClock> {
    dispatcher: Dispatcher<B>,
    cache: Mutex<EntityCache<C>>,
}

impl<B: CommandBridge> TunnelService<B> {
    pub fn new(dispatcher: Dispatcher<B>) -> Self {
        Self::with_cache(dispatcher, EntityCache::default())
    }
}

impl<B: CommandBridge, C: Clock> TunnelService<B, C> {
    pub fn with_cache(dispatcher: Dispatcher<B>, cache: EntityCache<C>) -> Self {
        Self {
            dispatcher,
            cache: Mutex::new(cache),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<B> {
        &self.dispatcher
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache().stats()
    }

    /// Lock the store. Callers must drop the guard before the next `.await`.
    fn cache(&self) -> MutexGuard<'_, EntityCache<C>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn invalidate(&self, keys: &[CacheKey]) {
        let mut cache = self.cache();
        for key in keys {
            cache.invalidate(key);
        }
    }

    fn invalidate_tunnel(&self, tunnel_id: &str) {
        self.invalidate(&[
            CacheKey::TunnelDetail(tunnel_id.to_string()),
            CacheKey::TunnelList,
        ]);
    }

    // ------------------------------------------------------------------
    // Tunnels
    // ------------------------------------------------------------------

    /// Full tunnel inventory, served from cache while fresh unless `force`
    pub async fn list_tunnels(&self, force: bool) -> Result<Vec<TunnelSummary>> {
        if !force {
            let cached = self.cache().tunnels();
            if let Some(tunnels) = cached {
                return Ok(tunnels);
            }
        }

        let epoch = self.cache().epoch(&CacheKey::TunnelList);
        let tunnels: Vec<TunnelSummary> = self
            .dispatcher
            .invoke_with_retry(
                commands::LIST_TUNNELS,
                json!({}),
                Some("Failed to list tunnels"),
            )
            .await?;

        self.cache().set_tunnels_if(epoch, tunnels.clone());
        Ok(tunnels)
    }

    /// Tag-filtered listing; bypasses the cache, which only holds the full list
    pub async fn list_tunnels_filtered(
        &self,
        req: &ListTunnelsRequest,
    ) -> Result<Vec<TunnelSummary>> {
        self.dispatcher
            .invoke_with_retry(
                commands::LIST_TUNNELS_LIGHT,
                json!({ "req": req }),
                Some("Failed to list tunnels"),
            )
            .await
    }

    /// Raw detail text of a tunnel, served from cache while fresh unless `force`
    pub async fn show_tunnel(&self, tunnel_id: &str, force: bool) -> Result<String> {
        if !force {
            let cached = self.cache().tunnel_detail(tunnel_id);
            if let Some(detail) = cached {
                return Ok(detail);
            }
        }

        let epoch = self
            .cache()
            .epoch(&CacheKey::TunnelDetail(tunnel_id.to_string()));
        let detail: String = self
            .dispatcher
            .invoke_with_retry(
                commands::SHOW_TUNNEL,
                json!({ "tunnelId": tunnel_id }),
                Some("Failed to show tunnel"),
            )
            .await?;

        self.cache().set_tunnel_detail_if(epoch, tunnel_id, detail.clone());
        Ok(detail)
    }

    pub async fn create_tunnel(&self, req: &CreateTunnelRequest) -> Result<String> {
        let out = self
            .dispatcher
            .invoke(
                commands::CREATE_TUNNEL,
                json!({ "req": req }),
                Some("Failed to create tunnel"),
            )
            .await?;
        self.invalidate(&[CacheKey::TunnelList]);
        Ok(out)
    }

    pub async fn update_tunnel(&self, req: &UpdateTunnelRequest) -> Result<String> {
        let out = self
            .dispatcher
            .invoke(
                commands::UPDATE_TUNNEL,
                json!({ "req": req }),
                Some("Failed to update tunnel"),
            )
            .await?;
        self.invalidate_tunnel(&req.tunnel_id);
        Ok(out)
    }

    pub async fn delete_tunnel(&self, tunnel_id: &str) -> Result<String> {
        let out = self
            .dispatcher
            .invoke(
                commands::DELETE_TUNNEL,
                json!({ "tunnelId": tunnel_id }),
                Some("Failed to delete tunnel"),
            )
            .await?;
        self.invalidate_tunnel(tunnel_id);
        Ok(out)
    }

    pub async fn delete_all_tunnels(&self) -> Result<String> {
        let out = self
            .dispatcher
            .invoke(
                commands::DELETE_ALL_TUNNELS,
                json!({}),
                Some("Failed to delete all tunnels"),
            )
            .await?;

        let mut cache = self.cache();
        cache.invalidate(&CacheKey::TunnelList);
        cache.invalidate_all_details();
        Ok(out)
    }

    pub async fn host_tunnel(&self, req: &HostTunnelRequest) -> Result<String> {
        let out = self
            .dispatcher
            .invoke(
                commands::HOST_TUNNEL,
                json!({ "req": req }),
                Some("Failed to host tunnel"),
            )
            .await?;
        self.invalidate_hosted(req);
        Ok(out)
    }

    pub async fn stop_tunnel(&self, tunnel_id: &str) -> Result<String> {
        let out = self
            .dispatcher
            .invoke(
                commands::STOP_TUNNEL,
                json!({ "tunnelId": tunnel_id }),
                Some("Failed to stop tunnel"),
            )
            .await?;
        self.invalidate_tunnel(tunnel_id);
        Ok(out)
    }

    pub async fn restart_tunnel(&self, req: &HostTunnelRequest) -> Result<String> {
        let out = self
            .dispatcher
            .invoke(
                commands::RESTART_TUNNEL,
                json!({ "req": req }),
                Some("Failed to restart tunnel"),
            )
            .await?;
        self.invalidate_hosted(req);
        Ok(out)
    }

    fn invalidate_hosted(&self, req: &HostTunnelRequest) {
        match &req.tunnel_id {
            Some(id) => self.invalidate_tunnel(id),
            None => self.invalidate(&[CacheKey::TunnelList]),
        }
    }

    /// Start time of the local host process
    pub async fn tunnel_start_time(&self, tunnel_id: &str) -> Result<String> {
        self.dispatcher
            .invoke(
                commands::GET_TUNNEL_START_TIME,
                json!({ "tunnelId": tunnel_id }),
                None,
            )
            .await
    }

    /// Hosting state derived from the cached detail text.
    ///
    /// The start time is only looked up while hosted, and a failed lookup
    /// leaves it empty instead of failing the status.
    pub async fn host_status(&self, tunnel_id: &str) -> Result<HostStatus> {
        let detail = self.show_tunnel(tunnel_id, false).await?;
        let host_connections = parser::host_connections(&detail);
        let hosted = parser::is_hosted(&detail);

        let started_at = if hosted {
            match self.tunnel_start_time(tunnel_id).await {
                Ok(started) => Some(started),
                Err(e) => {
                    debug!("No start time for {}: {}", tunnel_id, e);
                    None
                }
            }
        } else {
            None
        };

        Ok(HostStatus {
            hosted,
            host_connections,
            started_at,
        })
    }

    // ------------------------------------------------------------------
    // Ports
    // ------------------------------------------------------------------

    pub async fn create_port(&self, req: &CreatePortRequest) -> Result<String> {
        let out = self
            .dispatcher
            .invoke(
                commands::CREATE_PORT,
                json!({ "req": req }),
                Some("Failed to create port"),
            )
            .await?;
        self.invalidate(&[CacheKey::TunnelDetail(req.tunnel_id.clone())]);
        Ok(out)
    }

    pub async fn update_port(&self, req: &UpdatePortRequest) -> Result<String> {
        let out = self
            .dispatcher
            .invoke(
                commands::UPDATE_PORT,
                json!({ "req": req }),
                Some("Failed to update port"),
            )
            .await?;
        self.invalidate(&[CacheKey::TunnelDetail(req.tunnel_id.clone())]);
        Ok(out)
    }

    pub async fn delete_port(&self, tunnel_id: &str, port_number: u16) -> Result<String> {
        let out = self
            .dispatcher
            .invoke(
                commands::DELETE_PORT,
                json!({ "tunnelId": tunnel_id, "portNumber": port_number }),
                Some("Failed to delete port"),
            )
            .await?;
        self.invalidate(&[CacheKey::TunnelDetail(tunnel_id.to_string())]);
        Ok(out)
    }

    /// Ports as reported by `port list -j`
    pub async fn list_ports(&self, tunnel_id: &str) -> Result<Vec<Port>> {
        self.dispatcher
            .invoke_with_retry(
                commands::LIST_PORTS,
                json!({ "tunnelId": tunnel_id }),
                Some("Failed to list ports"),
            )
            .await
    }

    pub async fn ping_port(&self, url: &str) -> Result<PingResult> {
        self.dispatcher
            .invoke(commands::PING_PORT, json!({ "url": url }), Some("Ping failed"))
            .await
    }

    // ------------------------------------------------------------------
    // Access control
    // ------------------------------------------------------------------

    pub async fn create_access(&self, req: &CreateAccessRequest) -> Result<String> {
        let out = self
            .dispatcher
            .invoke(
                commands::CREATE_ACCESS,
                json!({ "req": req }),
                Some("Failed to create access"),
            )
            .await?;
        self.invalidate(&[CacheKey::TunnelDetail(req.tunnel_id.clone())]);
        Ok(out)
    }

    pub async fn list_access(&self, tunnel_id: &str) -> Result<String> {
        self.dispatcher
            .invoke_with_retry(
                commands::LIST_ACCESS,
                json!({ "tunnelId": tunnel_id }),
                Some("Failed to list access"),
            )
            .await
    }

    pub async fn reset_access(&self, tunnel_id: &str) -> Result<String> {
        let out = self
            .dispatcher
            .invoke(
                commands::RESET_ACCESS,
                json!({ "tunnelId": tunnel_id }),
                Some("Failed to reset access"),
            )
            .await?;
        self.invalidate(&[CacheKey::TunnelDetail(tunnel_id.to_string())]);
        Ok(out)
    }

    // ------------------------------------------------------------------
    // System
    // ------------------------------------------------------------------

    pub async fn list_clusters(&self, ping: bool) -> Result<Vec<Cluster>> {
        self.dispatcher
            .invoke_with_retry(
                commands::LIST_CLUSTERS,
                json!({ "ping": ping }),
                Some("Failed to list clusters"),
            )
            .await
    }

    /// devtunnel installation info, served from cache while fresh unless `force`
    pub async fn installation(&self, force: bool) -> Result<InstallationInfo> {
        if !force {
            let cached = self.cache().installation();
            if let Some(info) = cached {
                return Ok(info);
            }
        }

        let epoch = self.cache().epoch(&CacheKey::Installation);
        let info: InstallationInfo = self
            .dispatcher
            .invoke_with_retry(
                commands::CHECK_INSTALLATION,
                json!({}),
                Some("Failed to check devtunnel installation"),
            )
            .await?;
        self.cache().set_installation_if(epoch, info.clone());
        Ok(info)
    }

    /// Drop the cached installation info and look again
    pub async fn recheck_installation(&self) -> Result<InstallationInfo> {
        self.invalidate(&[CacheKey::Installation]);
        self.installation(true).await
    }

    pub async fn open_url(&self, url: &str) -> Result<String> {
        self.dispatcher
            .invoke(commands::OPEN_URL, json!({ "url": url }), Some("Failed to open URL"))
            .await
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Sign in; nothing cached under a previous identity survives.
    pub async fn login(&self, provider: AuthProvider, use_device_code: bool) -> Result<String> {
        let out = self
            .dispatcher
            .invoke(
                commands::LOGIN,
                json!({ "provider": provider, "useDeviceCode": use_device_code }),
                Some("Login failed"),
            )
            .await?;
        self.cache().reset();
        info!("Signed in, cache reset");
        Ok(out)
    }

    /// Sign out. The store is reset even when devtunnel reports a failure.
    pub async fn logout(&self) -> Result<String> {
        let result = self
            .dispatcher
            .invoke(commands::LOGOUT, json!({}), Some("Logout failed"))
            .await;
        self.cache().reset();
        result
    }

    /// Identity check. A failure means the session is gone: the store is
    /// reset and [`Error::SessionExpired`] is returned.
    pub async fn verify_session(&self) -> Result<UserInfo> {
        match self
            .dispatcher
            .invoke::<UserInfo>(commands::GET_USER_INFO, json!({}), None)
            .await
        {
            Ok(user) => Ok(user),
            Err(e) => {
                warn!("Session check failed: {}", e);
                self.cache().reset();
                Err(Error::SessionExpired)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CACHE_TTL, ManualClock};
    use crate::client::fixtures;
    use crate::client::{CommandResponse, MockBridge};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    type TestService = TunnelService<MockBridge, Arc<ManualClock>>;

    fn service(mock: MockBridge) -> (TestService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let svc = TunnelService::with_cache(
            Dispatcher::new(mock),
            EntityCache::new(clock.clone()),
        );
        (svc, clock)
    }

    fn mock(svc: &TestService) -> &MockBridge {
        svc.dispatcher().bridge()
    }

    fn summaries() -> Value {
        json!([
            { "tunnelId": "a", "ports": [], "status": "active" },
            { "tunnelId": "b", "ports": [], "status": "stopped" }
        ])
    }

    /// Service with list, detail[a] and detail[b] cached
    async fn warmed() -> (TestService, Arc<ManualClock>) {
        let bridge = MockBridge::new()
            .with_success(commands::LIST_TUNNELS, summaries())
            .with_success(commands::SHOW_TUNNEL, json!(fixtures::SHOW_HOSTED))
            .with_success(commands::CREATE_TUNNEL, json!("created"))
            .with_success(commands::UPDATE_TUNNEL, json!("updated"))
            .with_success(commands::DELETE_TUNNEL, json!("deleted"))
            .with_success(commands::DELETE_ALL_TUNNELS, json!("all deleted"))
            .with_success(commands::STOP_TUNNEL, json!("stopped"))
            .with_success(commands::CREATE_PORT, json!("port created"))
            .with_success(commands::RESET_ACCESS, json!("reset"));
        let (svc, clock) = service(bridge);

        svc.list_tunnels(false).await.unwrap();
        svc.show_tunnel("a", false).await.unwrap();
        svc.show_tunnel("b", false).await.unwrap();
        (svc, clock)
    }

    fn cached(svc: &TestService, key: &CacheKey) -> bool {
        let mut cache = svc.cache();
        match key {
            CacheKey::TunnelList => cache.tunnels().is_some(),
            CacheKey::TunnelDetail(id) => cache.tunnel_detail(id).is_some(),
            CacheKey::Installation => cache.installation().is_some(),
        }
    }

    fn detail(id: &str) -> CacheKey {
        CacheKey::TunnelDetail(id.to_string())
    }

    #[tokio::test]
    async fn test_list_served_from_cache_within_ttl() {
        let (svc, clock) = warmed().await;

        clock.advance(Duration::from_secs(120));
        let tunnels = svc.list_tunnels(false).await.unwrap();

        assert_eq!(tunnels.len(), 2);
        assert_eq!(mock(&svc).call_count(commands::LIST_TUNNELS), 1);
    }

    #[tokio::test]
    async fn test_list_refetched_after_ttl() {
        let (svc, clock) = warmed().await;

        clock.advance(CACHE_TTL);
        svc.list_tunnels(false).await.unwrap();

        assert_eq!(mock(&svc).call_count(commands::LIST_TUNNELS), 2);
    }

    #[tokio::test]
    async fn test_force_bypasses_fresh_cache() {
        let (svc, _clock) = warmed().await;

        svc.show_tunnel("a", true).await.unwrap();
        assert_eq!(mock(&svc).call_count(commands::SHOW_TUNNEL), 3);
    }

    #[tokio::test]
    async fn test_create_invalidates_only_the_list() {
        let (svc, _clock) = warmed().await;

        svc.create_tunnel(&CreateTunnelRequest::default())
            .await
            .unwrap();

        assert!(!cached(&svc, &CacheKey::TunnelList));
        assert!(cached(&svc, &detail("a")));
        assert!(cached(&svc, &detail("b")));
    }

    #[tokio::test]
    async fn test_update_invalidates_list_and_own_detail() {
        let (svc, _clock) = warmed().await;

        let req = UpdateTunnelRequest {
            tunnel_id: "a".into(),
            description: Some("renamed".into()),
            ..Default::default()
        };
        svc.update_tunnel(&req).await.unwrap();

        assert!(!cached(&svc, &CacheKey::TunnelList));
        assert!(!cached(&svc, &detail("a")));
        assert!(cached(&svc, &detail("b")));
    }

    #[tokio::test]
    async fn test_delete_leaves_other_details() {
        let (svc, _clock) = warmed().await;

        svc.delete_tunnel("a").await.unwrap();

        assert!(!cached(&svc, &CacheKey::TunnelList));
        assert!(!cached(&svc, &detail("a")));
        assert!(cached(&svc, &detail("b")));
    }

    #[tokio::test]
    async fn test_delete_all_clears_list_and_details() {
        let (svc, _clock) = warmed().await;
        svc.installation_seed();

        svc.delete_all_tunnels().await.unwrap();

        assert!(!cached(&svc, &CacheKey::TunnelList));
        assert!(!cached(&svc, &detail("a")));
        assert!(!cached(&svc, &detail("b")));
        assert!(cached(&svc, &CacheKey::Installation));
    }

    #[tokio::test]
    async fn test_port_mutation_invalidates_only_that_detail() {
        let (svc, _clock) = warmed().await;

        let req = CreatePortRequest {
            tunnel_id: "a".into(),
            port_number: 3000,
            protocol: None,
            description: None,
        };
        svc.create_port(&req).await.unwrap();

        assert!(!cached(&svc, &detail("a")));
        assert!(cached(&svc, &detail("b")));
        assert!(cached(&svc, &CacheKey::TunnelList));
    }

    #[tokio::test]
    async fn test_access_reset_invalidates_only_that_detail() {
        let (svc, _clock) = warmed().await;

        svc.reset_access("b").await.unwrap();

        assert!(cached(&svc, &detail("a")));
        assert!(!cached(&svc, &detail("b")));
        assert!(cached(&svc, &CacheKey::TunnelList));
    }

    #[tokio::test]
    async fn test_stop_invalidates_detail_and_list() {
        let (svc, _clock) = warmed().await;

        svc.stop_tunnel("a").await.unwrap();

        assert!(!cached(&svc, &detail("a")));
        assert!(!cached(&svc, &CacheKey::TunnelList));
        assert!(cached(&svc, &detail("b")));
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_cache() {
        let (svc, _clock) = warmed().await;
        mock(&svc).clear(commands::DELETE_TUNNEL);
        mock(&svc).push(
            commands::DELETE_TUNNEL,
            CommandResponse::error("Tunnel not found"),
        );

        assert!(svc.delete_tunnel("a").await.is_err());
        assert!(cached(&svc, &CacheKey::TunnelList));
        assert!(cached(&svc, &detail("a")));
        assert_eq!(mock(&svc).call_count(commands::DELETE_TUNNEL), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutations_are_not_retried() {
        let (svc, _clock) =
            service(MockBridge::new().with_failure(commands::CREATE_TUNNEL, "relay busy"));

        assert!(svc.create_tunnel(&CreateTunnelRequest::default()).await.is_err());
        assert_eq!(mock(&svc).call_count(commands::CREATE_TUNNEL), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_are_retried() {
        let (svc, _clock) = service(
            MockBridge::new()
                .with_failure(commands::SHOW_TUNNEL, "relay busy")
                .with_success(commands::SHOW_TUNNEL, json!(fixtures::SHOW_IDLE)),
        );

        let text = svc.show_tunnel("quiet-owl.euw", false).await.unwrap();
        assert_eq!(text, fixtures::SHOW_IDLE);
        assert_eq!(mock(&svc).call_count(commands::SHOW_TUNNEL), 2);
    }

    #[tokio::test]
    async fn test_session_expiry_resets_everything() {
        let (svc, _clock) = warmed().await;
        svc.installation_seed();
        mock(&svc).push(
            commands::GET_USER_INFO,
            CommandResponse::error("Not logged in"),
        );

        let err = svc.verify_session().await.unwrap_err();

        assert!(matches!(err, Error::SessionExpired));
        assert!(!cached(&svc, &CacheKey::TunnelList));
        assert!(!cached(&svc, &detail("a")));
        assert!(!cached(&svc, &CacheKey::Installation));
    }

    #[tokio::test]
    async fn test_valid_session_keeps_cache() {
        let (svc, _clock) = warmed().await;
        mock(&svc).push(
            commands::GET_USER_INFO,
            CommandResponse::success(json!({
                "userId": "octo-dev",
                "userName": "octo-dev",
                "provider": "github",
                "isAuthenticated": true
            })),
        );

        let user = svc.verify_session().await.unwrap();
        assert_eq!(user.display_name(), "octo-dev");
        assert!(cached(&svc, &CacheKey::TunnelList));
    }

    #[tokio::test]
    async fn test_logout_resets_even_on_failure() {
        let (svc, _clock) = warmed().await;
        mock(&svc).push(commands::LOGOUT, CommandResponse::error("devtunnel crashed"));

        assert!(svc.logout().await.is_err());
        assert!(!cached(&svc, &CacheKey::TunnelList));
        assert!(!cached(&svc, &detail("b")));
    }

    #[tokio::test]
    async fn test_login_resets_store() {
        let (svc, _clock) = warmed().await;
        mock(&svc).push(commands::LOGIN, CommandResponse::success(json!("ok")));

        svc.login(AuthProvider::GitHub, false).await.unwrap();

        assert!(!cached(&svc, &CacheKey::TunnelList));
        let args = mock(&svc).call_args(commands::LOGIN);
        assert_eq!(args[0], json!({ "provider": "github", "useDeviceCode": false }));
    }

    #[tokio::test]
    async fn test_host_status_with_start_time() {
        let (svc, _clock) = service(
            MockBridge::new()
                .with_success(commands::SHOW_TUNNEL, json!(fixtures::SHOW_HOSTED))
                .with_success(
                    commands::GET_TUNNEL_START_TIME,
                    json!("Mon Jan 15 14:30:25 2024"),
                ),
        );

        let status = svc.host_status("bright-fox.usw2").await.unwrap();
        assert!(status.hosted);
        assert_eq!(status.host_connections, Some(1));
        assert_eq!(status.started_at.as_deref(), Some("Mon Jan 15 14:30:25 2024"));
    }

    #[tokio::test]
    async fn test_host_status_start_time_failure_degrades() {
        let (svc, _clock) = service(
            MockBridge::new()
                .with_success(commands::SHOW_TUNNEL, json!(fixtures::SHOW_HOSTED))
                .with_failure(commands::GET_TUNNEL_START_TIME, "ps unavailable"),
        );

        let status = svc.host_status("bright-fox.usw2").await.unwrap();
        assert!(status.hosted);
        assert!(status.started_at.is_none());
    }

    #[tokio::test]
    async fn test_idle_tunnel_skips_start_time_lookup() {
        let (svc, _clock) = service(
            MockBridge::new().with_success(commands::SHOW_TUNNEL, json!(fixtures::SHOW_IDLE)),
        );

        let status = svc.host_status("quiet-owl.euw").await.unwrap();
        assert!(!status.hosted);
        assert_eq!(status.host_connections, Some(0));
        assert_eq!(mock(&svc).call_count(commands::GET_TUNNEL_START_TIME), 0);
    }

    #[tokio::test]
    async fn test_installation_cached_until_recheck() {
        let info = json!({ "installed": true, "path": "/usr/bin/devtunnel", "version": "1.0" });
        let (svc, _clock) = service(
            MockBridge::new().with_success(commands::CHECK_INSTALLATION, info),
        );

        svc.installation(false).await.unwrap();
        svc.installation(false).await.unwrap();
        assert_eq!(mock(&svc).call_count(commands::CHECK_INSTALLATION), 1);

        svc.recheck_installation().await.unwrap();
        assert_eq!(mock(&svc).call_count(commands::CHECK_INSTALLATION), 2);
    }

    /// Parks the first call of `command` until `release` is notified
    struct GatedBridge {
        inner: MockBridge,
        command: &'static str,
        armed: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    impl GatedBridge {
        fn new(command: &'static str, inner: MockBridge) -> Self {
            Self {
                inner,
                command,
                armed: AtomicBool::new(true),
                entered: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl CommandBridge for GatedBridge {
        async fn invoke(&self, command: &str, args: Value) -> CommandResponse<Value> {
            if command == self.command && self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.invoke(command, args).await
        }
    }

    fn gated(
        command: &'static str,
        inner: MockBridge,
    ) -> TunnelService<GatedBridge, Arc<ManualClock>> {
        TunnelService::with_cache(
            Dispatcher::new(GatedBridge::new(command, inner)),
            EntityCache::new(Arc::new(ManualClock::new())),
        )
    }

    #[tokio::test]
    async fn test_detail_read_racing_port_mutation_is_not_cached() {
        let svc = gated(
            commands::SHOW_TUNNEL,
            MockBridge::new()
                .with_success(commands::SHOW_TUNNEL, json!("Ports:\n8080 http\n"))
                .with_success(
                    commands::SHOW_TUNNEL,
                    json!("Ports:\n8080 http\n3000 http\n"),
                )
                .with_success(commands::CREATE_PORT, json!("port created")),
        );
        let bridge = svc.dispatcher().bridge();

        let mutate = async {
            bridge.entered.notified().await;
            let req = CreatePortRequest {
                tunnel_id: "a".into(),
                port_number: 3000,
                protocol: None,
                description: None,
            };
            svc.create_port(&req).await.unwrap();
            bridge.release.notify_one();
        };
        let (first, ()) = tokio::join!(svc.show_tunnel("a", false), mutate);

        assert_eq!(first.unwrap(), "Ports:\n8080 http\n");
        assert!(svc.cache().tunnel_detail("a").is_none());

        let fresh = svc.show_tunnel("a", false).await.unwrap();
        assert_eq!(fresh, "Ports:\n8080 http\n3000 http\n");
        assert_eq!(bridge.inner.call_count(commands::SHOW_TUNNEL), 2);
    }

    #[tokio::test]
    async fn test_list_read_racing_create_is_not_cached() {
        let svc = gated(
            commands::LIST_TUNNELS,
            MockBridge::new()
                .with_success(commands::LIST_TUNNELS, summaries())
                .with_success(commands::CREATE_TUNNEL, json!("created")),
        );
        let bridge = svc.dispatcher().bridge();

        let mutate = async {
            bridge.entered.notified().await;
            svc.create_tunnel(&CreateTunnelRequest::default())
                .await
                .unwrap();
            bridge.release.notify_one();
        };
        let (listed, ()) = tokio::join!(svc.list_tunnels(false), mutate);

        assert_eq!(listed.unwrap().len(), 2);
        assert!(svc.cache().tunnels().is_none());
    }

    #[tokio::test]
    async fn test_installation_read_racing_logout_is_not_cached() {
        let info = json!({ "installed": true, "path": "/usr/bin/devtunnel", "version": "1.0" });
        let svc = gated(
            commands::CHECK_INSTALLATION,
            MockBridge::new()
                .with_success(commands::CHECK_INSTALLATION, info)
                .with_success(commands::LOGOUT, json!("Logged out")),
        );
        let bridge = svc.dispatcher().bridge();

        let mutate = async {
            bridge.entered.notified().await;
            svc.logout().await.unwrap();
            bridge.release.notify_one();
        };
        let (checked, ()) = tokio::join!(svc.installation(false), mutate);

        assert!(checked.unwrap().installed);
        assert!(svc.cache().installation().is_none());
    }

    impl TestService {
        fn installation_seed(&self) {
            self.cache().set_installation(InstallationInfo {
                installed: true,
                path: None,
                version: None,
            });
        }
    }
}
