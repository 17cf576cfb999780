//! PinEnvironment - the collaborators every pinned handle is given

use std::sync::Arc;

use tracing::debug;

use super::config::PinConfig;
use super::resolver::IdentityResolver;
use crate::backup::{StateArchive, ViewArchive};
use crate::events::EventBus;
use crate::process::{ActorBinder, ActorTable, ContextMonitor};
use crate::registry::PinRegistry;

/// Explicitly passed shared services for pinned handles
///
/// Cheap to clone; every field is shared. The registry and event bus are the
/// only state shared across handles.
#[derive(Clone)]
pub struct PinEnvironment {
    pub actors: Arc<dyn ActorTable>,
    pub binder: Arc<dyn ActorBinder>,
    pub context: Arc<dyn ContextMonitor>,
    pub archive: Arc<dyn StateArchive>,
    pub registry: Arc<PinRegistry>,
    pub events: Arc<EventBus>,
    pub resolver: IdentityResolver,
    pub config: PinConfig,
}

impl PinEnvironment {
    /// Build an environment with a fresh registry and event bus
    pub fn new(
        actors: Arc<dyn ActorTable>,
        binder: Arc<dyn ActorBinder>,
        context: Arc<dyn ContextMonitor>,
        archive: Arc<dyn StateArchive>,
        config: PinConfig,
    ) -> Self {
        debug!(?config, "PinEnvironment::new: called");
        let events = Arc::new(EventBus::new(config.event_capacity));
        let registry = Arc::new(PinRegistry::new(events.clone()));
        Self {
            actors,
            binder,
            context,
            archive,
            registry,
            events,
            resolver: IdentityResolver::new(),
            config,
        }
    }

    /// Build an environment where one process object provides every collaborator
    pub fn for_process<P>(process: Arc<P>, config: PinConfig) -> Self
    where
        P: ActorTable + ActorBinder + ContextMonitor + 'static,
    {
        debug!("PinEnvironment::for_process: called");
        Self::new(
            process.clone(),
            process.clone(),
            process,
            Arc::new(ViewArchive::new()),
            config,
        )
    }
}
