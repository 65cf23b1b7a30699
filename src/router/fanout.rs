//! Per-slot routing fan-out

use super::backend::{Router, RoutingBackend};
use crate::discovery::SourceHandle;
use crate::error::{Error, Result};

struct RouterInstance {
    name: String,
    router: Box<dyn Router>,
    target: Option<SourceHandle>,
}

/// One router per camera slot, named `CAM1`, `CAM2`, ...
pub struct RouterFanout {
    routers: Vec<RouterInstance>,
}

impl RouterFanout {
    /// Create `count` routers, each starting cleared
    pub fn new(backend: &dyn RoutingBackend, count: usize) -> Self {
        let routers = (0..count)
            .map(|slot| {
                let name = super::router_name(slot);
                let mut router = backend.create(&name);
                router.clear();
                RouterInstance {
                    name,
                    router,
                    target: None,
                }
            })
            .collect();

        Self { routers }
    }

    /// Route a slot to a source, or clear it with `None`
    ///
    /// Downstream calls are fire-and-forget; there is nothing to retry.
    pub fn set_target(&mut self, slot: usize, source: Option<&SourceHandle>) -> Result<()> {
        let count = self.routers.len();
        let instance = self
            .routers
            .get_mut(slot)
            .ok_or(Error::SlotOutOfRange { slot, count })?;

        match source {
            Some(handle) => {
                instance.router.change(handle);
                tracing::debug!(router = %instance.name, source = %handle.name, "Routing changed");
            }
            None => {
                instance.router.clear();
                tracing::debug!(router = %instance.name, "Routing cleared");
            }
        }
        instance.target = source.cloned();
        Ok(())
    }

    /// Last target requested for a slot
    pub fn target(&self, slot: usize) -> Option<&SourceHandle> {
        self.routers.get(slot).and_then(|r| r.target.as_ref())
    }

    /// Number of routers
    pub fn len(&self) -> usize {
        self.routers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routers.is_empty()
    }
}
