//! VISCA-over-IP PTZ relays
//!
//! Each camera slot gets a UDP relay on its own port. PTZ controllers are
//! pointed at the relay once; switching the slot's source re-aims the relay
//! at the new camera without touching the controller.
//!
//! # Addressing
//!
//! - The controller address is learned from traffic and owned by the relay
//!   task. The newest non-camera sender is the one replies go to.
//! - The camera address is set by the binding layer and handed to the task
//!   through a `watch` channel.

pub mod frame;
pub mod instance;
pub mod set;

pub use frame::{fix_inquiry, ViscaHeader};
pub use instance::RelayInstance;
pub use set::RelaySet;

/// Well-known VISCA-over-IP port on the cameras
pub const VISCA_PORT: u16 = 52381;

/// Largest datagram the relay forwards intact
pub const RECV_BUFFER_SIZE: usize = 1024;
