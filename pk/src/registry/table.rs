//! PinRegistry claim table and selection

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{ActorAddress, PinId};
use crate::events::{EventBus, PinEvent};

/// Internal state protected by lock
#[derive(Default)]
pub(crate) struct RegistryInner {
    /// Address each pin is currently bound to
    claims: HashMap<PinId, ActorAddress>,

    /// Currently selected pin
    selected: Option<PinId>,
}

/// Consistent copy of the claim table taken under one lock acquisition
#[derive(Debug, Clone, Default)]
pub struct ClaimSnapshot {
    by_address: HashMap<ActorAddress, PinId>,
}

impl ClaimSnapshot {
    /// Pin currently claiming this address, if any
    pub fn claimant(&self, address: ActorAddress) -> Option<PinId> {
        self.by_address.get(&address).copied()
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

/// Tracks claimed addresses and the selected pin
pub struct PinRegistry {
    inner: RwLock<RegistryInner>,
    events: Arc<EventBus>,
}

impl PinRegistry {
    /// Create an empty registry publishing selection changes to `events`
    pub fn new(events: Arc<EventBus>) -> Self {
        debug!("PinRegistry::new: called");
        Self {
            inner: RwLock::new(RegistryInner::default()),
            events,
        }
    }

    /// Record that `pin` is bound to `address`, replacing its previous claim
    ///
    /// The ownership check and the insert happen under one write guard. An
    /// address already claimed by a different pin is refused with that pin's id.
    pub async fn claim(&self, pin: PinId, address: ActorAddress) -> Result<(), PinId> {
        debug!(%pin, %address, "PinRegistry::claim: called");
        let mut inner = self.inner.write().await;
        if let Some((owner, _)) = inner
            .claims
            .iter()
            .find(|(owner, claimed)| **claimed == address && **owner != pin)
        {
            debug!(%pin, %address, %owner, "PinRegistry::claim: address owned by another pin");
            return Err(*owner);
        }
        if let Some(previous) = inner.claims.insert(pin, address)
            && previous != address
        {
            debug!(%pin, %previous, %address, "PinRegistry::claim: replaced previous claim");
        }
        Ok(())
    }

    /// Drop the claim held by `pin`
    pub async fn release(&self, pin: PinId) -> Option<ActorAddress> {
        debug!(%pin, "PinRegistry::release: called");
        self.inner.write().await.claims.remove(&pin)
    }

    /// Pin currently claiming `address`, if any
    pub async fn claimant(&self, address: ActorAddress) -> Option<PinId> {
        debug!(%address, "PinRegistry::claimant: called");
        let inner = self.inner.read().await;
        inner
            .claims
            .iter()
            .find(|(_, claimed)| **claimed == address)
            .map(|(pin, _)| *pin)
    }

    /// Address claimed by `pin`, if any
    pub async fn claim_of(&self, pin: PinId) -> Option<ActorAddress> {
        self.inner.read().await.claims.get(&pin).copied()
    }

    /// Take a consistent snapshot of every claim
    pub async fn claims(&self) -> ClaimSnapshot {
        debug!("PinRegistry::claims: called");
        let inner = self.inner.read().await;
        ClaimSnapshot {
            by_address: inner.claims.iter().map(|(pin, address)| (*address, *pin)).collect(),
        }
    }

    /// Select `pin`; selecting the already-selected pin re-announces it
    pub async fn select(&self, pin: PinId) {
        debug!(%pin, "PinRegistry::select: called");
        self.inner.write().await.selected = Some(pin);
        self.events.emit(PinEvent::SelectionChanged { pin_id: Some(pin) });
    }

    /// Clear the selection
    pub async fn clear_selection(&self) {
        debug!("PinRegistry::clear_selection: called");
        let cleared = self.inner.write().await.selected.take();
        if cleared.is_some() {
            self.events.emit(PinEvent::SelectionChanged { pin_id: None });
        }
    }

    /// Currently selected pin
    pub async fn selected(&self) -> Option<PinId> {
        self.inner.read().await.selected
    }

    pub async fn is_selected(&self, pin: PinId) -> bool {
        self.inner.read().await.selected == Some(pin)
    }

    /// Hold the registry so callers queue up behind the returned guard
    #[cfg(test)]
    pub(crate) async fn hold(&self) -> tokio::sync::RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (PinRegistry, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new(16));
        (PinRegistry::new(bus.clone()), bus)
    }

    #[tokio::test]
    async fn test_claim_and_lookup() {
        let (registry, _bus) = registry();
        let a = PinId::new();
        let addr = ActorAddress::new(0x10);

        assert_eq!(registry.claimant(addr).await, None);
        registry.claim(a, addr).await.unwrap();
        assert_eq!(registry.claimant(addr).await, Some(a));
        assert_eq!(registry.claim_of(a).await, Some(addr));
    }

    #[tokio::test]
    async fn test_rebind_replaces_claim() {
        let (registry, _bus) = registry();
        let a = PinId::new();
        let old = ActorAddress::new(0x10);
        let new = ActorAddress::new(0x20);

        registry.claim(a, old).await.unwrap();
        registry.claim(a, new).await.unwrap();

        assert_eq!(registry.claimant(old).await, None);
        assert_eq!(registry.claimant(new).await, Some(a));
    }

    #[tokio::test]
    async fn test_claim_refuses_address_owned_by_other_pin() {
        let (registry, _bus) = registry();
        let a = PinId::new();
        let b = PinId::new();
        let addr = ActorAddress::new(0x10);

        registry.claim(a, addr).await.unwrap();
        assert_eq!(registry.claim(b, addr).await, Err(a));
        assert_eq!(registry.claimant(addr).await, Some(a));
        assert_eq!(registry.claim_of(b).await, None);

        // Re-claiming your own address is fine
        assert_eq!(registry.claim(a, addr).await, Ok(()));
    }

    #[tokio::test]
    async fn test_concurrent_claims_have_one_winner() {
        let (registry, _bus) = registry();
        let registry = Arc::new(registry);
        let addr = ActorAddress::new(0x10);
        let pins: Vec<PinId> = (0..8).map(|_| PinId::new()).collect();

        let guard = registry.hold().await;
        let tasks: Vec<_> = pins
            .iter()
            .map(|pin| {
                let registry = registry.clone();
                let pin = *pin;
                tokio::spawn(async move { registry.claim(pin, addr).await.is_ok() })
            })
            .collect();
        drop(guard);

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(registry.claimant(addr).await.is_some());
    }

    #[tokio::test]
    async fn test_release() {
        let (registry, _bus) = registry();
        let a = PinId::new();
        let addr = ActorAddress::new(0x10);

        registry.claim(a, addr).await.unwrap();
        assert_eq!(registry.release(a).await, Some(addr));
        assert_eq!(registry.claimant(addr).await, None);
        assert_eq!(registry.release(a).await, None);
    }

    #[tokio::test]
    async fn test_claim_snapshot_is_consistent_copy() {
        let (registry, _bus) = registry();
        let a = PinId::new();
        let b = PinId::new();
        registry.claim(a, ActorAddress::new(0x10)).await.unwrap();
        registry.claim(b, ActorAddress::new(0x20)).await.unwrap();

        let snapshot = registry.claims().await;
        registry.release(a).await;

        // Snapshot is unaffected by later changes
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.claimant(ActorAddress::new(0x10)), Some(a));
        assert_eq!(snapshot.claimant(ActorAddress::new(0x20)), Some(b));
        assert_eq!(snapshot.claimant(ActorAddress::new(0x30)), None);
    }

    #[tokio::test]
    async fn test_selection_events() {
        let (registry, bus) = registry();
        let mut rx = bus.subscribe();
        let a = PinId::new();

        registry.select(a).await;
        assert!(registry.is_selected(a).await);
        assert_eq!(registry.selected().await, Some(a));

        registry.clear_selection().await;
        assert_eq!(registry.selected().await, None);
        // Clearing an empty selection is silent
        registry.clear_selection().await;

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, PinEvent::SelectionChanged { pin_id: Some(id) } if id == a));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, PinEvent::SelectionChanged { pin_id: None }));
        assert!(rx.try_recv().is_err());
    }
}
