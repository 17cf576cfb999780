//! TargetService - owns the pinned handles and the selection

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::error::PinError;
use crate::domain::{ActorAddress, PinId};
use crate::events::EventBus;
use crate::pin::{PinEnvironment, PinSummary, PinnedHandle};

/// Creates, selects, ticks and removes pins
///
/// The first pin created while nothing is selected becomes the selection.
pub struct TargetService {
    env: PinEnvironment,
    pins: RwLock<Vec<Arc<PinnedHandle>>>,
}

impl TargetService {
    pub fn new(env: PinEnvironment) -> Self {
        debug!("TargetService::new: called");
        Self {
            env,
            pins: RwLock::new(Vec::new()),
        }
    }

    pub fn environment(&self) -> &PinEnvironment {
        &self.env
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.env.events.clone()
    }

    /// Pin the actor at `address`
    ///
    /// An address that is already claimed returns the existing pin.
    pub async fn pin_actor(&self, address: ActorAddress) -> Result<Arc<PinnedHandle>, PinError> {
        debug!(%address, "TargetService::pin_actor: called");

        if let Some(owner) = self.env.registry.claimant(address).await
            && let Some(existing) = self.get(owner).await
        {
            debug!(%address, pin_id = %owner, "TargetService::pin_actor: already pinned");
            return Ok(existing);
        }

        let view = self
            .env
            .binder
            .bind(address)
            .map_err(|source| PinError::Bind { address, source })?;
        let handle = match PinnedHandle::pin(self.env.clone(), view).await {
            Ok(handle) => handle,
            Err(PinError::AlreadyPinned { address, owner }) => {
                debug!(%address, pin_id = %owner, "TargetService::pin_actor: claimed concurrently");
                return self
                    .get(owner)
                    .await
                    .ok_or(PinError::AlreadyPinned { address, owner });
            }
            Err(e) => return Err(e),
        };
        self.pins.write().await.push(handle.clone());

        if self.env.registry.selected().await.is_none() {
            debug!(pin_id = %handle.id(), "TargetService::pin_actor: nothing selected, selecting new pin");
            handle.select().await;
        }

        Ok(handle)
    }

    /// Pin the first visible actor whose stable identity carries `name`
    pub async fn pin_by_name(&self, name: &str) -> Result<Arc<PinnedHandle>, PinError> {
        debug!(%name, "TargetService::pin_by_name: called");
        let prefix = format!("n{}_k", name);
        let address = self
            .env
            .actors
            .all_actors()
            .into_iter()
            .find(|actor| !actor.is_hidden && actor.identity.stable_key.starts_with(&prefix))
            .map(|actor| actor.address)
            .ok_or_else(|| PinError::NoSuchActor(name.to_string()))?;
        self.pin_actor(address).await
    }

    /// Remove a pin; the selection moves to the next pin if it was selected
    pub async fn unpin(&self, id: PinId) -> Result<(), PinError> {
        debug!(pin_id = %id, "TargetService::unpin: called");
        let (handle, next) = {
            let mut pins = self.pins.write().await;
            let index = pins
                .iter()
                .position(|pin| pin.id() == id)
                .ok_or(PinError::NotFound(id))?;
            let handle = pins.remove(index);
            (handle, pins.first().cloned())
        };

        let was_selected = handle.is_selected().await;
        handle.dispose().await;
        self.env.events.emitter_for(id).unpinned();

        if was_selected {
            match next {
                Some(next) => next.select().await,
                None => self.env.registry.clear_selection().await,
            }
        }

        info!(pin_id = %id, "Unpinned actor");
        Ok(())
    }

    /// Every pin in creation order
    pub async fn pinned(&self) -> Vec<Arc<PinnedHandle>> {
        self.pins.read().await.clone()
    }

    pub async fn get(&self, id: PinId) -> Option<Arc<PinnedHandle>> {
        self.pins.read().await.iter().find(|pin| pin.id() == id).cloned()
    }

    pub async fn selected(&self) -> Option<Arc<PinnedHandle>> {
        let id = self.env.registry.selected().await?;
        self.get(id).await
    }

    pub async fn select(&self, id: PinId) -> Result<(), PinError> {
        debug!(pin_id = %id, "TargetService::select: called");
        let handle = self.get(id).await.ok_or(PinError::NotFound(id))?;
        handle.select().await;
        Ok(())
    }

    /// Tick every pin concurrently
    pub async fn tick_all(&self) {
        let pins = self.pinned().await;
        debug!(count = pins.len(), "TargetService::tick_all: called");
        join_all(pins.iter().map(|pin| pin.tick())).await;
    }

    pub async fn summaries(&self) -> Vec<PinSummary> {
        let pins = self.pinned().await;
        join_all(pins.iter().map(|pin| pin.summary())).await
    }

    /// Dispose every pin
    pub async fn shutdown(&self) {
        debug!("TargetService::shutdown: called");
        let pins: Vec<_> = self.pins.write().await.drain(..).collect();
        for pin in &pins {
            pin.dispose().await;
        }
        self.env.registry.clear_selection().await;
        info!(count = pins.len(), "Target service shut down");
    }
}
