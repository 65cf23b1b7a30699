//! Routing SDK seam
//!
//! A router is a virtual output that tells receivers watching it to pull
//! video from another source. No media flows through this process.

use std::sync::{Arc, Mutex};

use crate::discovery::SourceHandle;

/// Factory for routers
pub trait RoutingBackend: Send + Sync {
    /// Create a router advertised as `name`
    fn create(&self, name: &str) -> Box<dyn Router>;
}

/// One routing output
pub trait Router: Send + Sync {
    /// Point receivers of this router at `source`
    fn change(&mut self, source: &SourceHandle);

    /// Point receivers of this router at nothing
    fn clear(&mut self);
}

/// A call made on a [`MemoryRouting`] router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCall {
    /// Router name
    pub router: String,
    /// New target, `None` for a clear
    pub target: Option<SourceHandle>,
}

/// In-process routing backend that records every call
///
/// Clones share the same call log.
#[derive(Clone, Default)]
pub struct MemoryRouting {
    calls: Arc<Mutex<Vec<RouteCall>>>,
}

impl MemoryRouting {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls so far, oldest first
    pub fn calls(&self) -> Vec<RouteCall> {
        self.lock().clone()
    }

    /// Calls made on one router
    pub fn calls_for(&self, router: &str) -> Vec<RouteCall> {
        self.lock()
            .iter()
            .filter(|call| call.router == router)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RouteCall>> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RoutingBackend for MemoryRouting {
    fn create(&self, name: &str) -> Box<dyn Router> {
        Box::new(MemoryRouter {
            name: name.to_string(),
            log: self.clone(),
        })
    }
}

struct MemoryRouter {
    name: String,
    log: MemoryRouting,
}

impl Router for MemoryRouter {
    fn change(&mut self, source: &SourceHandle) {
        self.log.lock().push(RouteCall {
            router: self.name.clone(),
            target: Some(source.clone()),
        });
    }

    fn clear(&mut self) {
        self.log.lock().push(RouteCall {
            router: self.name.clone(),
            target: None,
        });
    }
}
