//! Source discovery and caching
//!
//! ```text
//!   DiscoverySession ──poll()──► SourceCache { name -> Source }
//!                                   │            ▲
//!                 sorted_names()/find()          │ set_ptz_name()
//!                                   ▼            │
//!                               BindingTable ────┘
//! ```
//!
//! The cache only grows between refreshes. Sources that stop being advertised
//! stay bound and are reported as stale once unseen for [`STALE_AFTER`].

use std::time::Duration;

pub mod backend;
pub mod cache;
pub mod source;

pub use backend::{Discovery, DiscoverySession, MemoryDiscovery};
pub use cache::SourceCache;
pub use source::{default_ptz_name, Source, SourceHandle, SourceKind, NONE_SOURCE_NAME};

/// A dynamic source unseen for longer than this is stale
pub const STALE_AFTER: Duration = Duration::from_secs(60);

/// Pseudo-sources created by relays and remote viewers carry this in their name
pub const DEFAULT_EXCLUDE_PATTERN: &str = "Remote Connection";
