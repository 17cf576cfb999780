//! Error types for pin management

use thiserror::Error;

use crate::domain::{ActorAddress, PinId};
use crate::process::MemoryError;

/// Errors from creating, finding or removing pins
#[derive(Debug, Error)]
pub enum PinError {
    #[error("Failed to bind actor at {address}: {source}")]
    Bind {
        address: ActorAddress,
        #[source]
        source: MemoryError,
    },

    #[error("Actor at {address} is already pinned by {owner}")]
    AlreadyPinned { address: ActorAddress, owner: PinId },

    #[error("No pin with id {0}")]
    NotFound(PinId),

    #[error("No actor named {0:?} is visible")]
    NoSuchActor(String),
}
