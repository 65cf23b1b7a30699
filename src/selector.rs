//! Camera selector
//!
//! Ties the pieces together the way an operator drives them: discovery runs
//! in the background, saved bindings are re-applied once discovery has had
//! time to find the sources, and every assignment made through the selector
//! is saved straight away.
//!
//! ```text
//!   poll task ──► SourceCache ◄── assign()/set_ptz() ──► BindingTable ──► routers
//!                     ▲                                       │        └─► relays
//!   restore task ─────┴──── StateStore ◄──── save ────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::binding::{BindingTable, CameraSlot};
use crate::config::SelectorConfig;
use crate::discovery::{Discovery, SourceCache};
use crate::error::{Error, Result};
use crate::persist::StateStore;
use crate::relay::RelaySet;
use crate::resolve::Resolver;
use crate::router::{RouterFanout, RoutingBackend};
use crate::trigger::ControlTrigger;

/// Running selector
pub struct CameraSelector {
    config: SelectorConfig,
    cache: Arc<SourceCache>,
    table: Mutex<BindingTable>,
    store: Arc<dyn StateStore>,
    resolver: Arc<dyn Resolver>,
    cancel: CancellationToken,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
}

impl CameraSelector {
    /// Bind the relays, create the routers and start discovery
    ///
    /// Fails if any relay port can't be bound. Saved bindings are applied
    /// after `config.restore_delay`.
    pub async fn start(
        config: SelectorConfig,
        discovery: Arc<dyn Discovery>,
        routing: &dyn RoutingBackend,
        store: Arc<dyn StateStore>,
        resolver: Arc<dyn Resolver>,
    ) -> Result<Arc<Self>> {
        let cancel = CancellationToken::new();
        let count = config.camera_count;

        let relays = RelaySet::bind(
            count,
            config.relay_base_port,
            config.camera_port,
            config.fix_inquiry,
            Arc::clone(&resolver),
            cancel.child_token(),
        )
        .await?;
        let routers = RouterFanout::new(routing, count);
        let trigger = match &config.trigger {
            Some(trigger) => ControlTrigger::connect(trigger).await,
            None => ControlTrigger::disabled(),
        };
        let table = BindingTable::new(routers, relays, trigger)?;

        let cache = Arc::new(SourceCache::with_options(
            discovery,
            config.exclude_pattern.clone(),
            config.stale_after,
        ));
        let poll_task = cache.spawn_poll_task(
            config.poll_interval,
            config.poll_startup_delay,
            cancel.child_token(),
        );

        tracing::info!(
            cameras = count,
            relay_base_port = config.relay_base_port,
            camera_port = config.camera_port,
            "Camera selector started"
        );

        let selector = Arc::new(Self {
            table: Mutex::new(table),
            config,
            cache,
            store,
            resolver,
            cancel,
            tasks: StdMutex::new(vec![poll_task]),
        });
        selector.schedule_restore();

        Ok(selector)
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<SourceCache> {
        &self.cache
    }

    /// Source names for display, sentinel first
    pub async fn sorted_names(&self) -> Vec<String> {
        self.cache.sorted_names().await
    }

    /// Snapshot of every camera slot
    pub async fn slots(&self) -> Vec<CameraSlot> {
        self.table.lock().await.slots().to_vec()
    }

    /// Address a PTZ controller should send to for a slot
    pub async fn relay_addr(&self, slot: usize) -> Option<SocketAddr> {
        self.table
            .lock()
            .await
            .relays()
            .get(slot)
            .map(|relay| relay.local_addr())
    }

    /// Bind a slot to a cached source by name and save
    ///
    /// The binding stands even if saving fails; the save error is returned.
    pub async fn assign(&self, slot: usize, source_name: &str) -> Result<bool> {
        let source = self
            .cache
            .find(source_name)
            .await
            .ok_or_else(|| Error::UnknownSource(source_name.to_string()))?;

        let mut table = self.table.lock().await;
        let changed = table.set_source(slot, &source).await?;
        self.save(&table).await?;

        Ok(changed)
    }

    /// Set a source's PTZ hostname and save
    ///
    /// A non-empty hostname must resolve; otherwise nothing changes. An empty
    /// one restores the default.
    pub async fn set_ptz(&self, source_name: &str, ptz_name: &str) -> Result<()> {
        let source = self
            .cache
            .find(source_name)
            .await
            .ok_or_else(|| Error::UnknownSource(source_name.to_string()))?;
        if !source.is_dynamic() {
            return Err(Error::NotDynamic(source_name.to_string()));
        }
        if !ptz_name.is_empty() {
            self.resolver.resolve(ptz_name).await?;
        }

        let mut table = self.table.lock().await;
        table.set_ptz_name(&self.cache, source_name, ptz_name).await?;
        self.save(&table).await
    }

    /// Forget every discovered source and unassign all slots
    ///
    /// Saved bindings are re-applied after the restore delay.
    pub async fn refresh(self: &Arc<Self>) -> Result<()> {
        self.table.lock().await.clear_all().await?;
        self.cache.refresh().await;
        self.schedule_restore();
        Ok(())
    }

    /// Apply the saved state now
    ///
    /// Safe to call repeatedly. A load failure leaves the bindings as they are.
    pub async fn restore_state(&self) -> Result<()> {
        let store = Arc::clone(&self.store);
        let loaded = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| Error::Persistence(e.to_string()))
            .and_then(|loaded| loaded);

        let state = match loaded {
            Ok(Some(state)) => state,
            Ok(None) => {
                tracing::debug!("No saved camera state");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Saved camera state not loaded");
                return Err(e);
            }
        };

        self.table
            .lock()
            .await
            .import_state(&self.cache, &state)
            .await?;
        tracing::info!("Camera state restored");
        Ok(())
    }

    /// Save the current state
    pub async fn save_state(&self) -> Result<()> {
        let table = self.table.lock().await;
        self.save(&table).await
    }

    /// Stop discovery and all relays
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let tasks: Vec<_> = self.lock_tasks().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Background task failed");
            }
        }

        self.table.lock().await.shutdown().await;
        tracing::info!("Camera selector stopped");
    }

    async fn save(&self, table: &BindingTable) -> Result<()> {
        let state = table.export_state(&self.cache).await;
        let store = Arc::clone(&self.store);

        tokio::task::spawn_blocking(move || store.save(&state))
            .await
            .map_err(|e| Error::Persistence(e.to_string()))
            .and_then(|saved| saved)
            .map_err(|e| {
                tracing::warn!(error = %e, "Camera state not saved");
                e
            })
    }

    fn schedule_restore(self: &Arc<Self>) {
        let selector = Arc::downgrade(self);
        let delay = self.config.restore_delay;
        let cancel = self.cancel.clone();

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            if let Some(selector) = selector.upgrade() {
                // failure already logged
                let _ = selector.restore_state().await;
            }
        });

        let mut tasks = self.lock_tasks();
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
