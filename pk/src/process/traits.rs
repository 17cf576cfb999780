//! Collaborator trait definitions

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::error::MemoryError;
use crate::domain::{ActorAddress, ActorKind, ActorSnapshot, GameContext, IdentityKey};

/// Enumerates the target process's live actor table
///
/// Must be cheap enough to call every tick and must return an empty set
/// (never fail) when no process is attached.
pub trait ActorTable: Send + Sync {
    /// All actors currently resolvable in the target process
    fn all_actors(&self) -> Vec<ActorSnapshot>;

    /// Whether an actor with this address is in the live table
    fn is_actor_in_table(&self, address: ActorAddress) -> bool {
        self.all_actors().iter().any(|actor| actor.address == address)
    }

    /// Whether a target process is attached at all
    fn is_attached(&self) -> bool;
}

/// Reports the current context and fires a notification on every transition
pub trait ContextMonitor: Send + Sync {
    fn current(&self) -> GameContext;

    /// Receiver of every context transition after this call
    fn subscribe(&self) -> broadcast::Receiver<GameContext>;
}

/// Constructs fresh views; a view is never rebound to a different address
pub trait ActorBinder: Send + Sync {
    fn bind(&self, address: ActorAddress) -> Result<Arc<dyn ActorView>, MemoryError>;
}

/// Properties an [`ActorView`] reports changes for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActorProperty {
    Name,
    DisplayName,
    Kind,
    ModelType,
    Hidden,
    State,
}

/// A refreshable view of one actor bound to one address
///
/// Field accessors return the values cached by the last successful `tick()`.
pub trait ActorView: Send + Sync {
    fn address(&self) -> ActorAddress;

    fn identity(&self) -> IdentityKey;

    fn name(&self) -> Option<String>;

    /// Name shown to users; defaults to the raw name
    fn display_name(&self) -> Option<String> {
        self.name()
    }

    fn kind(&self) -> ActorKind;

    fn model_type(&self) -> i32;

    /// Whether this object lives inside the photo context
    fn is_photo_actor(&self) -> bool;

    fn is_hidden(&self) -> bool;

    /// Whether the process is mid-way through redrawing this actor
    fn is_refreshing(&self) -> bool;

    /// Refresh cached fields from the live process; fails on an unreadable address
    fn tick(&self) -> Result<(), MemoryError>;

    /// Read the actor's full state document
    fn read_state(&self) -> Result<serde_json::Value, MemoryError>;

    /// Write a full state document back onto the actor
    fn write_state(&self, state: serde_json::Value) -> Result<(), MemoryError>;

    /// Subscribe to property changes observed by `tick()`
    fn subscribe(&self) -> broadcast::Receiver<ActorProperty>;

    /// Release cached resources; every later read or write fails
    fn dispose(&self);
}
