//! Backup and restore of full actor state across context transitions
//!
//! When the target process enters the photo context, each bound pin captures
//! its actor's full state. After the pin retargets across the boundary, the
//! captured state is applied to the new binding. Both operations are
//! best-effort: a missing binding is logged and skipped, never raised.

mod archive;
mod coordinator;
mod error;

pub use archive::{ActorBackup, ApplyMode, StateArchive, ViewArchive};
pub use coordinator::BackupCoordinator;
pub use error::BackupError;
