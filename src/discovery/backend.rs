//! Discovery SDK seam
//!
//! The network discovery library is reached through [`Discovery`]. A
//! [`DiscoverySession`] is one live finder; dropping it tears it down.
//! [`MemoryDiscovery`] is an in-process implementation used by tests and
//! by hosts without a discovery library.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::source::SourceHandle;

/// Factory for discovery sessions
pub trait Discovery: Send + Sync {
    /// Open a new finder
    fn open(&self) -> Box<dyn DiscoverySession>;
}

/// One live discovery finder
pub trait DiscoverySession: Send {
    /// Wait up to `timeout` for the advertised set to change
    ///
    /// Returns `true` if there was activity. A zero timeout must not block.
    fn wait_for_sources(&mut self, timeout: Duration) -> bool;

    /// Currently advertised sources
    fn current_sources(&mut self) -> Vec<SourceHandle>;
}

#[derive(Default)]
struct Advertised {
    sources: Vec<SourceHandle>,
    generation: u64,
}

/// In-process discovery
///
/// Clones share the same advertised set.
#[derive(Clone, Default)]
pub struct MemoryDiscovery {
    advertised: Arc<Mutex<Advertised>>,
    live_sessions: Arc<AtomicUsize>,
}

impl MemoryDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise a source, or re-advertise it if already present
    pub fn announce(&self, handle: SourceHandle) {
        let mut adv = self.lock();
        match adv.sources.iter_mut().find(|s| s.name == handle.name) {
            Some(existing) => *existing = handle,
            None => adv.sources.push(handle),
        }
        adv.generation += 1;
    }

    /// Stop advertising a source
    pub fn withdraw(&self, name: &str) {
        let mut adv = self.lock();
        adv.sources.retain(|s| s.name != name);
        adv.generation += 1;
    }

    /// Number of sessions opened and not yet dropped
    pub fn live_sessions(&self) -> usize {
        self.live_sessions.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Advertised> {
        self.advertised
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Discovery for MemoryDiscovery {
    fn open(&self) -> Box<dyn DiscoverySession> {
        self.live_sessions.fetch_add(1, Ordering::Relaxed);
        Box::new(MemorySession {
            discovery: self.clone(),
            seen_generation: 0,
        })
    }
}

struct MemorySession {
    discovery: MemoryDiscovery,
    seen_generation: u64,
}

impl DiscoverySession for MemorySession {
    fn wait_for_sources(&mut self, _timeout: Duration) -> bool {
        let generation = self.discovery.lock().generation;
        if generation != self.seen_generation {
            self.seen_generation = generation;
            true
        } else {
            false
        }
    }

    fn current_sources(&mut self) -> Vec<SourceHandle> {
        self.discovery.lock().sources.clone()
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.discovery.live_sessions.fetch_sub(1, Ordering::Relaxed);
    }
}
