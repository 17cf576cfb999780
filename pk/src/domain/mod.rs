//! Domain types for pinkeep
//!
//! Addresses, identity keys and per-scan actor snapshots read from the target
//! process, plus the pin identifier and initials derivation used by pinned handles.

mod actor;
mod id;
mod initials;

pub use actor::{ActorAddress, ActorKind, ActorSnapshot, GameContext, IdentityKey};
pub use id::PinId;
pub use initials::derive_initials;
