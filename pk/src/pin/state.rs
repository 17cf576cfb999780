//! Pin state and summary types

use serde::{Deserialize, Serialize};

use crate::domain::{ActorAddress, ActorKind, PinId};

/// Lifecycle state of a pinned handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PinState {
    /// Bound to a live actor
    Valid,
    /// Unbound; every tick attempts a retarget
    Invalid,
    /// Resolver in progress; ticks are no-ops
    Retargeting,
}

impl std::fmt::Display for PinState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinState::Valid => write!(f, "valid"),
            PinState::Invalid => write!(f, "invalid"),
            PinState::Retargeting => write!(f, "retargeting"),
        }
    }
}

/// Why a retarget was attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetargetReason {
    /// The pin was already invalid
    Invalid,
    /// The bound address disappeared from the actor table
    MissingFromTable,
    /// Bound to a photo actor and the process returned to the overworld
    LeftPhotoContext,
    /// The bound actor became hidden just as the process entered photo mode
    HiddenAtBoundary,
}

impl RetargetReason {
    /// Whether this retarget was caused by a context transition
    pub fn is_boundary(&self) -> bool {
        matches!(self, RetargetReason::LeftPhotoContext | RetargetReason::HiddenAtBoundary)
    }
}

impl std::fmt::Display for RetargetReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RetargetReason::Invalid => "invalid",
            RetargetReason::MissingFromTable => "missing-from-table",
            RetargetReason::LeftPhotoContext => "left-photo-context",
            RetargetReason::HiddenAtBoundary => "hidden-at-boundary",
        };
        write!(f, "{}", s)
    }
}

/// Point-in-time view of a pinned handle for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinSummary {
    pub pin_id: PinId,
    pub state: PinState,
    /// Bound address; `None` while invalid
    pub address: Option<ActorAddress>,
    /// Most recent bound address, kept after the binding is lost
    pub last_address: Option<ActorAddress>,
    pub bound: bool,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub initials: Option<String>,
    pub kind: ActorKind,
    pub model_type: i32,
    pub is_photo_actor: bool,
    pub is_hidden: bool,
    pub is_selected: bool,
    pub has_backup: bool,
}
