//! Pinkeep - stable handles on actors in a live game process
//!
//! A target process frees and reallocates its actor objects constantly and
//! swaps them for copies when it enters photo mode. Pinkeep keeps one
//! [`PinnedHandle`](pin::PinnedHandle) per logical actor, retargets it to the
//! actor's new object, and carries the actor's state across photo-mode
//! transitions.

pub mod backup;
pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod pin;
pub mod process;
pub mod registry;
pub mod target;

pub use backup::{ActorBackup, ApplyMode, BackupCoordinator, BackupError, StateArchive, ViewArchive};
pub use config::Config;
pub use domain::{ActorAddress, ActorKind, ActorSnapshot, GameContext, IdentityKey, PinId, derive_initials};
pub use events::{EventBus, PinEvent, PinProperty};
pub use pin::{PinConfig, PinEnvironment, PinState, PinSummary, PinnedHandle, RetargetReason};
pub use process::{ActorBinder, ActorTable, ActorView, ContextMonitor, MemoryError, SimActorSpec, SimulatedProcess};
pub use registry::PinRegistry;
pub use target::{PinError, PinTicker, TargetService};
