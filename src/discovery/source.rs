//! Source identity types
//!
//! A [`Source`] is one named video origin. Identity is the name: a source
//! that disappears and is re-advertised keeps its entry (and PTZ name), only
//! its discovery handle and last-seen time are rebound.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Name of the sentinel source every empty slot is bound to
pub const NONE_SOURCE_NAME: &str = "None";

/// Opaque discovery handle for an advertised source
///
/// This is what the routing layer needs to point a router at the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceHandle {
    /// Advertised source name (e.g. `"PTZ-CAM1 (Chapel)"`)
    pub name: String,
    /// Transport address advertised with the source, if any
    pub url_address: Option<String>,
}

impl SourceHandle {
    /// Create a handle with no transport address
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_address: None,
        }
    }

    /// Create a handle with a transport address
    pub fn with_address(name: impl Into<String>, url_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_address: Some(url_address.into()),
        }
    }
}

impl From<&str> for SourceHandle {
    fn from(name: &str) -> Self {
        SourceHandle::new(name)
    }
}

/// Kind of source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The "None" sentinel
    StaticNone,
    /// Source produced on this machine, registered by the embedder
    Local,
    /// Source found by discovery
    Dynamic,
}

/// A named video source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    name: String,
    kind: SourceKind,
    last_seen: Option<Instant>,
    ptz_name: String,
    handle: Option<SourceHandle>,
}

impl Source {
    /// The sentinel source
    pub fn none() -> Self {
        Self {
            name: NONE_SOURCE_NAME.to_string(),
            kind: SourceKind::StaticNone,
            last_seen: None,
            ptz_name: default_ptz_name(NONE_SOURCE_NAME),
            handle: None,
        }
    }

    /// A source just seen by discovery
    pub fn discovered(handle: SourceHandle, seen_at: Instant) -> Self {
        Self {
            name: handle.name.clone(),
            kind: SourceKind::Dynamic,
            last_seen: Some(seen_at),
            ptz_name: default_ptz_name(&handle.name),
            handle: Some(handle),
        }
    }

    /// A source produced on this machine
    ///
    /// Usually created through [`SourceCache::add_local`](super::SourceCache::add_local).
    pub fn local(handle: SourceHandle) -> Self {
        Self {
            name: handle.name.clone(),
            kind: SourceKind::Local,
            last_seen: None,
            ptz_name: default_ptz_name(&handle.name),
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn ptz_name(&self) -> &str {
        &self.ptz_name
    }

    pub fn handle(&self) -> Option<&SourceHandle> {
        self.handle.as_ref()
    }

    pub fn last_seen(&self) -> Option<Instant> {
        self.last_seen
    }

    pub fn is_sentinel(&self) -> bool {
        self.kind == SourceKind::StaticNone
    }

    pub fn is_local(&self) -> bool {
        self.kind == SourceKind::Local
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == SourceKind::Dynamic
    }

    /// Whether a dynamic source has gone unseen for longer than `window` at `now`
    ///
    /// Static and local sources are never stale.
    pub fn is_stale_at(&self, now: Instant, window: Duration) -> bool {
        match (self.kind, self.last_seen) {
            (SourceKind::Dynamic, Some(seen)) => now.saturating_duration_since(seen) > window,
            _ => false,
        }
    }

    /// Set the PTZ hostname
    ///
    /// An empty name resets to the default derived from the source name.
    /// Only dynamic sources may be retargeted.
    pub fn set_ptz_name(&mut self, ptz_name: &str) -> Result<()> {
        if !self.is_dynamic() {
            return Err(Error::NotDynamic(self.name.clone()));
        }

        self.ptz_name = if ptz_name.is_empty() {
            default_ptz_name(&self.name)
        } else {
            ptz_name.to_string()
        };
        Ok(())
    }

    /// Record a new sighting
    pub(crate) fn seen(&mut self, handle: SourceHandle, at: Instant) {
        self.last_seen = Some(at);
        self.handle = Some(handle);
    }
}

/// Default PTZ hostname: the first whitespace-delimited token of the name
///
/// Advertised names look like `"HOSTNAME (Channel)"`.
pub fn default_ptz_name(name: &str) -> String {
    name.split_whitespace().next().unwrap_or("").to_string()
}
