//! Slot to source binding table

use std::net::SocketAddr;

use super::state::PersistedState;
use crate::discovery::{Source, SourceCache};
use crate::error::{Error, Result};
use crate::relay::RelaySet;
use crate::router::{router_name, RouterFanout};
use crate::trigger::ControlTrigger;

/// One camera slot
#[derive(Debug, Clone)]
pub struct CameraSlot {
    name: String,
    source: Source,
}

impl CameraSlot {
    /// Display name (`CAM1`, `CAM2`, ...)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound source; the sentinel when unassigned
    pub fn source(&self) -> &Source {
        &self.source
    }
}

/// Camera slots and the routers and relays that follow them
pub struct BindingTable {
    slots: Vec<CameraSlot>,
    routers: RouterFanout,
    relays: RelaySet,
    trigger: ControlTrigger,
}

impl BindingTable {
    /// Create one slot per router, each bound to the sentinel
    ///
    /// Fails unless `relays` has one relay per router.
    pub fn new(routers: RouterFanout, relays: RelaySet, trigger: ControlTrigger) -> Result<Self> {
        if relays.len() != routers.len() {
            return Err(Error::SlotCountMismatch {
                routers: routers.len(),
                relays: relays.len(),
            });
        }

        let slots = (0..routers.len())
            .map(|slot| CameraSlot {
                name: router_name(slot),
                source: Source::none(),
            })
            .collect();

        Ok(Self {
            slots,
            routers,
            relays,
            trigger,
        })
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All slots, by index
    pub fn slots(&self) -> &[CameraSlot] {
        &self.slots
    }

    /// One slot
    pub fn slot(&self, slot: usize) -> Option<&CameraSlot> {
        self.slots.get(slot)
    }

    pub fn routers(&self) -> &RouterFanout {
        &self.routers
    }

    pub fn relays(&self) -> &RelaySet {
        &self.relays
    }

    /// Bind a slot to a source
    ///
    /// Returns `false` without side effects if the slot already has this
    /// source. Otherwise the router is re-targeted (cleared for the sentinel)
    /// and, for a real source, the PTZ relay is re-aimed and the show-control
    /// trigger pressed.
    pub async fn set_source(&mut self, slot: usize, source: &Source) -> Result<bool> {
        let count = self.slots.len();
        let current = self
            .slots
            .get(slot)
            .ok_or(Error::SlotOutOfRange { slot, count })?;

        if current.source.name() == source.name() {
            return Ok(false);
        }

        let handle = if source.is_sentinel() {
            None
        } else {
            source.handle()
        };
        self.routers.set_target(slot, handle)?;

        let cam = &mut self.slots[slot];
        let previous = std::mem::replace(&mut cam.source, source.clone());
        tracing::info!(
            camera = %cam.name,
            source = %source.name(),
            previous = %previous.name(),
            "Camera source changed"
        );

        if !source.is_sentinel() {
            aim_relay(&self.relays, slot, source.ptz_name()).await;
            self.trigger.press(slot).await;
        }

        Ok(true)
    }

    /// Change a source's PTZ hostname and re-aim every slot bound to it
    ///
    /// Only dynamic sources accept a PTZ name; an empty name restores the
    /// default. Several slots may share a source, all of them follow.
    pub async fn set_ptz_name(
        &mut self,
        cache: &SourceCache,
        source_name: &str,
        ptz_name: &str,
    ) -> Result<()> {
        let updated = cache.set_ptz_name(source_name, ptz_name).await?;
        tracing::info!(source = %source_name, ptz = %updated.ptz_name(), "PTZ name changed");

        self.follow(&updated).await;
        Ok(())
    }

    /// Bind every slot to the sentinel
    pub async fn clear_all(&mut self) -> Result<()> {
        let none = Source::none();
        for slot in 0..self.slots.len() {
            self.set_source(slot, &none).await?;
        }
        Ok(())
    }

    /// Snapshot of PTZ names and slot assignments
    pub async fn export_state(&self, cache: &SourceCache) -> PersistedState {
        PersistedState {
            sources: cache.export_bindings().await,
            cameras: self
                .slots
                .iter()
                .map(|cam| cam.source.name().to_string())
                .collect(),
        }
    }

    /// Apply saved state against the current cache
    ///
    /// PTZ names are restored first, then each slot is bound to its saved
    /// source if the cache knows it. Slots whose source is gone, and saved
    /// slots beyond this table, are left alone. Applying the same state
    /// twice changes nothing the second time.
    pub async fn import_state(&mut self, cache: &SourceCache, state: &PersistedState) -> Result<()> {
        cache.import_bindings(&state.sources).await;

        for (slot, name) in state.cameras.iter().enumerate().take(self.slots.len()) {
            let Some(source) = cache.find(name).await else {
                tracing::debug!(slot, source = %name, "Saved source not present, slot left unchanged");
                continue;
            };

            if !self.set_source(slot, &source).await? && !source.is_sentinel() {
                // already bound: its PTZ name may have just been restored
                self.follow(&source).await;
            }
        }
        Ok(())
    }

    /// Stop the relays
    pub async fn shutdown(&mut self) {
        self.relays.shutdown().await;
    }

    /// Refresh every slot bound to `source` and re-aim relays whose PTZ name moved
    async fn follow(&mut self, source: &Source) {
        for slot in 0..self.slots.len() {
            let cam = &mut self.slots[slot];
            if cam.source.name() != source.name() {
                continue;
            }

            let moved = cam.source.ptz_name() != source.ptz_name()
                || self.relays.get(slot).and_then(|r| r.camera_target()).is_none();
            cam.source = source.clone();

            if moved {
                aim_relay(&self.relays, slot, source.ptz_name()).await;
            }
        }
    }
}

async fn aim_relay(relays: &RelaySet, slot: usize, ptz_name: &str) -> Option<SocketAddr> {
    match relays.set_camera_target(slot, ptz_name).await {
        Ok(addr) => Some(addr),
        Err(e) => {
            tracing::warn!(slot, ptz = %ptz_name, error = %e, "PTZ target not updated");
            None
        }
    }
}
