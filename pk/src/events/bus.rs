//! Event Bus - central pub/sub for pinned-handle events
//!
//! Uses a tokio broadcast channel; publishing never blocks and never fails.

use tokio::sync::broadcast;
use tracing::debug;

use super::types::{PinEvent, PinProperty};
use crate::domain::{ActorAddress, PinId};
use crate::pin::RetargetReason;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Central event bus shared by every pinned handle and the registry
pub struct EventBus {
    tx: broadcast::Sender<PinEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no subscribers the event is dropped; if the channel is full
    /// the oldest events are dropped.
    pub fn emit(&self, event: PinEvent) {
        debug!(event_type = event.event_type(), pin_id = ?event.pin_id(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<PinEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter bound to one pin
    pub fn emitter_for(&self, pin_id: PinId) -> PinEmitter {
        debug!(%pin_id, "EventBus::emitter_for: creating emitter");
        PinEmitter {
            tx: self.tx.clone(),
            pin_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for one pinned handle to emit events without owning the bus
#[derive(Clone)]
pub struct PinEmitter {
    tx: broadcast::Sender<PinEvent>,
    pin_id: PinId,
}

impl PinEmitter {
    pub fn pin_id(&self) -> PinId {
        self.pin_id
    }

    /// Emit a raw event
    pub fn emit(&self, event: PinEvent) {
        debug!(event_type = event.event_type(), "PinEmitter::emit");
        let _ = self.tx.send(event);
    }

    // === Convenience methods ===

    pub fn pinned(&self, address: ActorAddress, name: Option<String>) {
        self.emit(PinEvent::Pinned {
            pin_id: self.pin_id,
            address,
            name,
        });
    }

    pub fn unpinned(&self) {
        self.emit(PinEvent::Unpinned { pin_id: self.pin_id });
    }

    pub fn retargeted(
        &self,
        old_address: Option<ActorAddress>,
        new_address: Option<ActorAddress>,
        reason: RetargetReason,
    ) {
        self.emit(PinEvent::Retargeted {
            pin_id: self.pin_id,
            old_address,
            new_address,
            reason,
        });
    }

    pub fn property_changed(&self, property: PinProperty) {
        self.emit(PinEvent::PropertyChanged {
            pin_id: self.pin_id,
            property,
        });
    }

    pub fn backup_captured(&self, address: ActorAddress) {
        self.emit(PinEvent::BackupCaptured {
            pin_id: self.pin_id,
            address,
        });
    }

    pub fn backup_restored(&self, address: ActorAddress) {
        self.emit(PinEvent::BackupRestored {
            pin_id: self.pin_id,
            address,
        });
    }

    pub fn backup_skipped(&self, message: impl Into<String>) {
        self.emit(PinEvent::BackupSkipped {
            pin_id: self.pin_id,
            message: message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let id = PinId::new();

        bus.emit(PinEvent::Unpinned { pin_id: id });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.pin_id(), Some(id));
        assert_eq!(event.event_type(), "Unpinned");
    }

    #[test]
    fn test_event_bus_no_subscribers() {
        let bus = EventBus::new(16);
        // Must not panic without subscribers
        bus.emit(PinEvent::SelectionChanged { pin_id: None });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_emitter_convenience_methods() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let id = PinId::new();
        let emitter = bus.emitter_for(id);

        emitter.pinned(ActorAddress::new(0x10), Some("Al".to_string()));
        emitter.retargeted(
            Some(ActorAddress::new(0x10)),
            Some(ActorAddress::new(0x20)),
            RetargetReason::MissingFromTable,
        );
        emitter.property_changed(PinProperty::Pointer);
        emitter.backup_captured(ActorAddress::new(0x20));
        emitter.backup_restored(ActorAddress::new(0x20));
        emitter.backup_skipped("no binding");
        emitter.unpinned();

        for _ in 0..7 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.pin_id(), Some(id));
        }
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(PinEvent::SelectionChanged { pin_id: None });

        assert_eq!(rx1.recv().await.unwrap().event_type(), "SelectionChanged");
        assert_eq!(rx2.recv().await.unwrap().event_type(), "SelectionChanged");
    }
}
