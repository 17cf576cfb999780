//! Pin registry
//!
//! The only state shared across pinned handles: which pin claims which actor
//! address, and which pin is currently selected. Handles query it without
//! holding each other's locks, so every operation goes through one internal lock.

mod table;

pub use table::{ClaimSnapshot, PinRegistry};
