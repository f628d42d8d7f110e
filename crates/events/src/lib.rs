//! Event system for Outreach Studio
//!
//! Fire-and-forget fan-out of store mutations to connected observers.
//! Delivery is best-effort at-most-once; observers reconcile with a full
//! refetch of the authoritative store state.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;
