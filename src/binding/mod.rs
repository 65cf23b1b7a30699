//! Camera slot bindings
//!
//! The binding table is the only writer of a slot's source. Changing it
//! re-aims the slot's router and PTZ relay before the call returns, so the
//! three never disagree.

pub mod state;
pub mod table;

pub use state::PersistedState;
pub use table::{BindingTable, CameraSlot};
