//! Target process collaborators
//!
//! The pinned-handle core never reads process memory itself. It talks to the
//! target process through these traits:
//!
//! - [`ActorTable`] - enumerate every live actor, check presence of an address
//! - [`ActorBinder`] - construct a fresh [`ActorView`] bound to one address
//! - [`ActorView`] - a richer, refreshable view of one actor
//! - [`ContextMonitor`] - overworld/photo state plus transition notifications
//!
//! [`SimulatedProcess`] implements all of them against an in-memory table.

mod error;
mod sim;
mod traits;

pub use error::MemoryError;
pub use sim::{SimActorSpec, SimulatedProcess};
pub use traits::{ActorBinder, ActorProperty, ActorTable, ActorView, ContextMonitor};
