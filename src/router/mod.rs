//! Video routing fan-out
//!
//! Every camera slot is exposed downstream as a router named after the slot.
//! Switchers select `CAM1`..`CAMn` once; the binding table decides which real
//! source each of those resolves to.

pub mod backend;
pub mod fanout;

pub use backend::{MemoryRouting, RouteCall, Router, RoutingBackend};
pub use fanout::RouterFanout;

/// Router name for a 0-based slot
pub fn router_name(slot: usize) -> String {
    format!("CAM{}", slot + 1)
}
