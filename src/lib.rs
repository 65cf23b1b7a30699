//! camsel: camera slot selector
//!
//! Keeps a fixed set of camera slots bound to network video sources found by
//! discovery. Each binding drives three things at once:
//!
//! - a named router (`CAM1`, `CAM2`, ...) that re-publishes the source
//! - a UDP relay that forwards PTZ control traffic to the source's camera
//! - an optional show-control button press
//!
//! Bindings and per-source PTZ hostnames are saved and restored across runs.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use camsel::discovery::{MemoryDiscovery, SourceHandle};
//! use camsel::persist::JsonFileStore;
//! use camsel::resolve::DnsResolver;
//! use camsel::router::MemoryRouting;
//! use camsel::{CameraSelector, SelectorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let discovery = MemoryDiscovery::new();
//!     discovery.announce(SourceHandle::new("PTZ-CAM1 (Stage)"));
//!
//!     let selector = CameraSelector::start(
//!         SelectorConfig::default(),
//!         Arc::new(discovery),
//!         &MemoryRouting::new(),
//!         Arc::new(JsonFileStore::new("camsel.json")),
//!         Arc::new(DnsResolver),
//!     )
//!     .await?;
//!
//!     selector.assign(0, "PTZ-CAM1 (Stage)").await?;
//!     selector.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod binding;
pub mod config;
pub mod discovery;
pub mod error;
pub mod persist;
pub mod relay;
pub mod resolve;
pub mod router;
pub mod selector;
pub mod trigger;

pub use config::{SelectorConfig, TriggerConfig};
pub use error::{Error, Result};
pub use selector::CameraSelector;
