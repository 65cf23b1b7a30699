//! Discovered source cache
//!
//! The cache is written by the discovery poll task and read by the control
//! side. Every access, reads included, goes through one mutex so a lookup
//! never observes a half-applied poll.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::backend::{Discovery, DiscoverySession};
use super::source::{Source, SourceHandle, NONE_SOURCE_NAME};
use super::{DEFAULT_EXCLUDE_PATTERN, STALE_AFTER};
use crate::error::{Error, Result};

struct CacheState {
    session: Box<dyn DiscoverySession>,
    sources: HashMap<String, Source>,
}

impl CacheState {
    fn seeded(session: Box<dyn DiscoverySession>) -> Self {
        let mut sources = HashMap::new();
        sources.insert(NONE_SOURCE_NAME.to_string(), Source::none());
        Self { session, sources }
    }
}

/// Cache of known sources, keyed by name
pub struct SourceCache {
    state: Mutex<CacheState>,
    discovery: Arc<dyn Discovery>,
    exclude_pattern: String,
    stale_after: Duration,
    changes: watch::Sender<u64>,
}

impl SourceCache {
    /// Create a cache with the default exclusion pattern and stale window
    pub fn new(discovery: Arc<dyn Discovery>) -> Self {
        Self::with_options(discovery, DEFAULT_EXCLUDE_PATTERN, STALE_AFTER)
    }

    /// Create a cache with a custom exclusion pattern and stale window
    pub fn with_options(
        discovery: Arc<dyn Discovery>,
        exclude_pattern: impl Into<String>,
        stale_after: Duration,
    ) -> Self {
        let session = discovery.open();
        let (changes, _) = watch::channel(0);

        Self {
            state: Mutex::new(CacheState::seeded(session)),
            discovery,
            exclude_pattern: exclude_pattern.into(),
            stale_after,
            changes,
        }
    }

    /// Drop the current finder and start over with only the sentinel
    pub async fn refresh(&self) {
        let mut state = self.state.lock().await;
        let old = std::mem::replace(&mut *state, CacheState::seeded(self.discovery.open()));
        drop(old);
        drop(state);

        tracing::info!("Source cache refreshed");
        self.changes.send_modify(|generation| *generation += 1);
    }

    /// Run one non-blocking discovery check
    ///
    /// Returns `true` if a previously unknown source was added. Entries are
    /// never removed here; staleness is computed on read.
    pub async fn poll(&self) -> bool {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if !state.session.wait_for_sources(Duration::ZERO) {
            return false;
        }

        let now = Instant::now();
        let mut changed = false;

        for handle in state.session.current_sources() {
            if self.is_excluded(&handle.name) {
                continue;
            }

            match state.sources.get_mut(&handle.name) {
                Some(source) if source.is_dynamic() => source.seen(handle, now),
                Some(_) => {}
                None => {
                    tracing::info!(source = %handle.name, "Source discovered");
                    state
                        .sources
                        .insert(handle.name.clone(), Source::discovered(handle, now));
                    changed = true;
                }
            }
        }
        drop(guard);

        if changed {
            self.changes.send_modify(|generation| *generation += 1);
        }
        changed
    }

    /// Add a source produced on this machine
    ///
    /// Discovery hides local sources, so an embedder that publishes its own
    /// outputs registers them here to make them assignable. They never go
    /// stale, keep their default PTZ name, are left out of
    /// [`sorted_names`](Self::sorted_names) and are dropped by
    /// [`refresh`](Self::refresh). Returns `false` if the name is taken.
    pub async fn add_local(&self, handle: SourceHandle) -> bool {
        let mut state = self.state.lock().await;
        if state.sources.contains_key(&handle.name) {
            return false;
        }

        tracing::info!(source = %handle.name, "Local source added");
        state
            .sources
            .insert(handle.name.clone(), Source::local(handle));
        true
    }

    /// Look up a source by name
    pub async fn find(&self, name: &str) -> Option<Source> {
        self.state.lock().await.sources.get(name).cloned()
    }

    /// Sentinel name first, then every dynamic source name in ascending order
    pub async fn sorted_names(&self) -> Vec<String> {
        let state = self.state.lock().await;

        let mut names: Vec<String> = state
            .sources
            .values()
            .filter(|s| s.is_dynamic())
            .map(|s| s.name().to_string())
            .collect();
        names.sort();
        names.insert(0, NONE_SOURCE_NAME.to_string());
        names
    }

    /// Names of dynamic sources that have not been advertised recently
    pub async fn stale_names(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let now = Instant::now();

        let mut names: Vec<String> = state
            .sources
            .values()
            .filter(|s| s.is_stale_at(now, self.stale_after))
            .map(|s| s.name().to_string())
            .collect();
        names.sort();
        names
    }

    /// Whether a source has gone stale under this cache's window
    pub fn is_stale(&self, source: &Source) -> bool {
        source.is_stale_at(Instant::now(), self.stale_after)
    }

    /// Set the PTZ hostname of a cached source, returning the updated source
    pub async fn set_ptz_name(&self, name: &str, ptz_name: &str) -> Result<Source> {
        let mut state = self.state.lock().await;
        let source = state
            .sources
            .get_mut(name)
            .ok_or_else(|| Error::UnknownSource(name.to_string()))?;

        source.set_ptz_name(ptz_name)?;
        Ok(source.clone())
    }

    /// `(name, ptz_name)` for every cached source, sentinel first
    pub async fn export_bindings(&self) -> Vec<(String, String)> {
        let state = self.state.lock().await;

        let mut bindings: Vec<(String, String)> = state
            .sources
            .values()
            .filter(|s| !s.is_sentinel())
            .map(|s| (s.name().to_string(), s.ptz_name().to_string()))
            .collect();
        bindings.sort();

        if let Some(none) = state.sources.get(NONE_SOURCE_NAME) {
            bindings.insert(0, (none.name().to_string(), none.ptz_name().to_string()));
        }
        bindings
    }

    /// Restore PTZ names; names not in the cache are ignored
    pub async fn import_bindings(&self, bindings: &[(String, String)]) {
        let mut state = self.state.lock().await;

        for (name, ptz_name) in bindings {
            if let Some(source) = state.sources.get_mut(name) {
                // static sources keep their PTZ name
                let _ = source.set_ptz_name(ptz_name);
            }
        }
    }

    /// Number of cached sources, sentinel included
    pub async fn len(&self) -> usize {
        self.state.lock().await.sources.len()
    }

    /// Watch channel bumped whenever the cache gains a source or is refreshed
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Spawn the background discovery poll task
    ///
    /// Runs until `cancel` fires.
    pub fn spawn_poll_task(
        self: &Arc<Self>,
        interval: Duration,
        startup_delay: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(startup_delay) => {}
            }

            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if cache.poll().await {
                            tracing::debug!("Source list changed");
                        }
                    }
                }
            }

            tracing::debug!("Discovery poll task stopped");
        })
    }

    fn is_excluded(&self, name: &str) -> bool {
        !self.exclude_pattern.is_empty() && name.contains(&self.exclude_pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{MemoryDiscovery, SourceHandle};

    fn cache_with(discovery: &MemoryDiscovery) -> SourceCache {
        SourceCache::new(Arc::new(discovery.clone()))
    }

    #[tokio::test]
    async fn test_starts_with_sentinel() {
        let discovery = MemoryDiscovery::new();
        let cache = cache_with(&discovery);

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.sorted_names().await, vec!["None"]);
        assert!(cache.find("None").await.unwrap().is_sentinel());
    }

    #[tokio::test]
    async fn test_poll_inserts_new_sources() {
        let discovery = MemoryDiscovery::new();
        let cache = cache_with(&discovery);

        assert!(!cache.poll().await);

        discovery.announce("CAM-B (Side)".into());
        discovery.announce("CAM-A (Front)".into());
        assert!(cache.poll().await);

        let src = cache.find("CAM-A (Front)").await.unwrap();
        assert!(src.is_dynamic());
        assert_eq!(src.ptz_name(), "CAM-A");
        assert!(src.last_seen().is_some());
    }

    #[tokio::test]
    async fn test_poll_rediscovery_keeps_identity() {
        let discovery = MemoryDiscovery::new();
        let cache = cache_with(&discovery);

        discovery.announce("CAM-A (Front)".into());
        assert!(cache.poll().await);
        cache.set_ptz_name("CAM-A (Front)", "10.1.1.9").await.unwrap();
        let first_seen = cache.find("CAM-A (Front)").await.unwrap().last_seen();

        tokio::time::sleep(Duration::from_millis(5)).await;
        discovery.announce(SourceHandle::with_address("CAM-A (Front)", "10.1.1.9:5961"));
        assert!(!cache.poll().await);

        let src = cache.find("CAM-A (Front)").await.unwrap();
        assert_eq!(src.ptz_name(), "10.1.1.9");
        assert!(src.last_seen() > first_seen);
        assert_eq!(
            src.handle().unwrap().url_address.as_deref(),
            Some("10.1.1.9:5961")
        );
    }

    #[tokio::test]
    async fn test_poll_never_removes() {
        let discovery = MemoryDiscovery::new();
        let cache = cache_with(&discovery);

        discovery.announce("CAM-A (Front)".into());
        cache.poll().await;
        discovery.withdraw("CAM-A (Front)");
        assert!(!cache.poll().await);

        assert!(cache.find("CAM-A (Front)").await.is_some());
    }

    #[tokio::test]
    async fn test_poll_skips_excluded_sources() {
        let discovery = MemoryDiscovery::new();
        let cache = cache_with(&discovery);

        discovery.announce("STUDIO (Remote Connection 1)".into());
        assert!(!cache.poll().await);
        assert!(cache.find("STUDIO (Remote Connection 1)").await.is_none());
    }

    #[tokio::test]
    async fn test_sorted_names() {
        let discovery = MemoryDiscovery::new();
        let cache = cache_with(&discovery);

        for name in ["zeta (1)", "Alpha (1)", "beta (2)", "Beta (1)"] {
            discovery.announce(name.into());
        }
        cache.poll().await;

        assert_eq!(
            cache.sorted_names().await,
            vec!["None", "Alpha (1)", "Beta (1)", "beta (2)", "zeta (1)"]
        );
    }

    #[tokio::test]
    async fn test_advertised_sentinel_name_is_ignored() {
        let discovery = MemoryDiscovery::new();
        let cache = cache_with(&discovery);

        discovery.announce("None".into());
        cache.poll().await;

        let none = cache.find("None").await.unwrap();
        assert!(none.is_sentinel());
        assert!(none.handle().is_none());
        assert_eq!(cache.sorted_names().await, vec!["None"]);
    }

    #[tokio::test]
    async fn test_staleness() {
        let discovery = MemoryDiscovery::new();
        let cache = SourceCache::with_options(
            Arc::new(discovery.clone()),
            DEFAULT_EXCLUDE_PATTERN,
            Duration::from_millis(10),
        );

        discovery.announce("CAM-A (Front)".into());
        cache.poll().await;
        let src = cache.find("CAM-A (Front)").await.unwrap();
        assert!(!cache.is_stale(&src));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.is_stale(&src));
        assert!(!cache.is_stale(&Source::none()));
        assert_eq!(cache.stale_names().await, vec!["CAM-A (Front)"]);
    }

    #[tokio::test]
    async fn test_refresh_resets_to_sentinel() {
        let discovery = MemoryDiscovery::new();
        let cache = cache_with(&discovery);
        let mut changes = cache.subscribe_changes();

        discovery.announce("CAM-A (Front)".into());
        cache.poll().await;
        assert_eq!(cache.len().await, 2);
        assert!(changes.has_changed().unwrap());
        changes.mark_unchanged();

        cache.refresh().await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(discovery.live_sessions(), 1);
        assert!(changes.has_changed().unwrap());

        // the new finder reports the still-advertised source again
        assert!(cache.poll().await);
        assert!(cache.find("CAM-A (Front)").await.is_some());
    }

    #[tokio::test]
    async fn test_set_ptz_name_validation() {
        let discovery = MemoryDiscovery::new();
        let cache = cache_with(&discovery);

        assert!(matches!(
            cache.set_ptz_name("None", "x").await,
            Err(Error::NotDynamic(_))
        ));
        assert!(matches!(
            cache.set_ptz_name("missing", "x").await,
            Err(Error::UnknownSource(_))
        ));
    }

    #[tokio::test]
    async fn test_export_import_bindings() {
        let discovery = MemoryDiscovery::new();
        let cache = cache_with(&discovery);

        discovery.announce("CAM-B (Side)".into());
        discovery.announce("CAM-A (Front)".into());
        cache.poll().await;
        cache.set_ptz_name("CAM-B (Side)", "ptz-b.local").await.unwrap();

        let exported = cache.export_bindings().await;
        assert_eq!(
            exported,
            vec![
                ("None".to_string(), "None".to_string()),
                ("CAM-A (Front)".to_string(), "CAM-A".to_string()),
                ("CAM-B (Side)".to_string(), "ptz-b.local".to_string()),
            ]
        );

        cache.refresh().await;
        cache.poll().await;
        assert_eq!(cache.find("CAM-B (Side)").await.unwrap().ptz_name(), "CAM-B");

        let mut with_unknown = exported.clone();
        with_unknown.push(("GONE (1)".to_string(), "gone".to_string()));
        cache.import_bindings(&with_unknown).await;

        assert_eq!(cache.export_bindings().await, exported);
        assert!(cache.find("GONE (1)").await.is_none());
    }

    #[tokio::test]
    async fn test_poll_task_cancel() {
        let discovery = MemoryDiscovery::new();
        let cache = Arc::new(cache_with(&discovery));
        let cancel = CancellationToken::new();
        let mut changes = cache.subscribe_changes();

        let handle =
            cache.spawn_poll_task(Duration::from_millis(10), Duration::ZERO, cancel.clone());

        discovery.announce("CAM-A (Front)".into());
        tokio::time::timeout(Duration::from_secs(2), changes.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(cache.find("CAM-A (Front)").await.is_some());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_local_source() {
        let discovery = MemoryDiscovery::new();
        discovery.announce("CAM-A (1)".into());
        let cache = cache_with(&discovery);

        assert!(cache.add_local(SourceHandle::new("STUDIO (Program)")).await);
        assert!(!cache.add_local(SourceHandle::new("None")).await);

        // a local name advertised later stays local
        discovery.announce("STUDIO (Program)".into());
        assert!(cache.poll().await);

        let local = cache.find("STUDIO (Program)").await.unwrap();
        assert!(local.is_local());
        assert!(!cache.is_stale(&local));
        assert!(matches!(
            cache.set_ptz_name("STUDIO (Program)", "x").await,
            Err(Error::NotDynamic(_))
        ));
        assert_eq!(cache.sorted_names().await, vec!["None", "CAM-A (1)"]);

        cache.refresh().await;
        assert!(cache.find("STUDIO (Program)").await.is_none());
    }
}
