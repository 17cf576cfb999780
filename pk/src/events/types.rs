//! Event types for pinned-handle activity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ActorAddress, PinId};
use crate::pin::RetargetReason;

/// Derived display fields of a pinned handle that observers can refresh on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PinProperty {
    Identity,
    Name,
    DisplayName,
    Initials,
    Kind,
    ModelType,
    Pointer,
    PhotoActor,
    Hidden,
    Valid,
}

/// The vocabulary of pinned-handle activity
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PinEvent {
    /// A live actor was pinned
    Pinned {
        pin_id: PinId,
        address: ActorAddress,
        name: Option<String>,
    },
    /// A pin was explicitly removed
    Unpinned { pin_id: PinId },
    /// A retarget attempt finished; `new_address` is `None` when the actor was lost
    ///
    /// Sent after every successful retarget, and after a failed one that dropped
    /// a live binding. Further failed attempts by a pin that is already unbound
    /// are not reported, so a lost actor produces one loss event rather than one
    /// per tick until it comes back.
    Retargeted {
        pin_id: PinId,
        old_address: Option<ActorAddress>,
        new_address: Option<ActorAddress>,
        reason: RetargetReason,
    },
    /// A derived display field changed value
    PropertyChanged { pin_id: PinId, property: PinProperty },
    /// The selected pin changed (or was re-announced)
    SelectionChanged { pin_id: Option<PinId> },
    /// Full actor state was captured on entering the photo context
    BackupCaptured { pin_id: PinId, address: ActorAddress },
    /// A captured backup was applied to a new binding
    BackupRestored { pin_id: PinId, address: ActorAddress },
    /// A backup or restore was skipped
    BackupSkipped { pin_id: PinId, message: String },
}

impl PinEvent {
    /// Pin this event is about, if any
    pub fn pin_id(&self) -> Option<PinId> {
        match self {
            PinEvent::Pinned { pin_id, .. }
            | PinEvent::Unpinned { pin_id }
            | PinEvent::Retargeted { pin_id, .. }
            | PinEvent::PropertyChanged { pin_id, .. }
            | PinEvent::BackupCaptured { pin_id, .. }
            | PinEvent::BackupRestored { pin_id, .. }
            | PinEvent::BackupSkipped { pin_id, .. } => Some(*pin_id),
            PinEvent::SelectionChanged { pin_id } => *pin_id,
        }
    }

    /// Event type name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            PinEvent::Pinned { .. } => "Pinned",
            PinEvent::Unpinned { .. } => "Unpinned",
            PinEvent::Retargeted { .. } => "Retargeted",
            PinEvent::PropertyChanged { .. } => "PropertyChanged",
            PinEvent::SelectionChanged { .. } => "SelectionChanged",
            PinEvent::BackupCaptured { .. } => "BackupCaptured",
            PinEvent::BackupRestored { .. } => "BackupRestored",
            PinEvent::BackupSkipped { .. } => "BackupSkipped",
        }
    }
}

/// Wrapper for persisted events with timestamp
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Timestamp of the event
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    /// The event
    pub event: PinEvent,
}

impl EventLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(event: PinEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_id_accessor() {
        let id = PinId::new();
        let event = PinEvent::Retargeted {
            pin_id: id,
            old_address: Some(ActorAddress::new(0x10)),
            new_address: None,
            reason: RetargetReason::MissingFromTable,
        };
        assert_eq!(event.pin_id(), Some(id));
        assert_eq!(PinEvent::SelectionChanged { pin_id: None }.pin_id(), None);
    }

    #[test]
    fn test_serialized_tag_matches_event_type() {
        let event = PinEvent::PropertyChanged {
            pin_id: PinId::new(),
            property: PinProperty::Initials,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["property"], "initials");
    }

    #[test]
    fn test_retargeted_addresses_serialize_as_numbers() {
        let event = PinEvent::Retargeted {
            pin_id: PinId::new(),
            old_address: None,
            new_address: Some(ActorAddress::new(4096)),
            reason: RetargetReason::Invalid,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json["old_address"].is_null());
        assert_eq!(json["new_address"], 4096);
        assert_eq!(json["reason"], "invalid");
    }

    #[test]
    fn test_event_log_entry_timestamp() {
        let before = Utc::now();
        let entry = EventLogEntry::new(PinEvent::Unpinned { pin_id: PinId::new() });
        let after = Utc::now();

        assert!(entry.timestamp >= before);
        assert!(entry.timestamp <= after);
    }
}
