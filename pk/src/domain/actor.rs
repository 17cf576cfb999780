//! Actor identity and snapshot types
//!
//! An actor is identified by two keys: one that includes its current address
//! and one that survives moves. Snapshots are read once per table scan and are
//! never mutated afterwards.

use serde::{Deserialize, Serialize};

/// Address of an actor object inside the target process
///
/// Zero is the null address; a view bound to it reads nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorAddress(usize);

impl ActorAddress {
    /// The null address
    pub const NULL: ActorAddress = ActorAddress(0);

    pub fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> usize {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for ActorAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl From<usize> for ActorAddress {
    fn from(raw: usize) -> Self {
        Self(raw)
    }
}

/// Object kind as reported by the actor table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActorKind {
    Player,
    BattleNpc,
    EventNpc,
    Companion,
    Mount,
    Ornament,
    Retainer,
    #[default]
    Other,
}

impl std::fmt::Display for ActorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActorKind::Player => "player",
            ActorKind::BattleNpc => "battle-npc",
            ActorKind::EventNpc => "event-npc",
            ActorKind::Companion => "companion",
            ActorKind::Mount => "mount",
            ActorKind::Ornament => "ornament",
            ActorKind::Retainer => "retainer",
            ActorKind::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// Which of the two mutually exclusive modes the target process is in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameContext {
    /// The ordinary world
    #[default]
    Overworld,
    /// The instanced photo mode; actors are copied in on entry and destroyed on exit
    Photo,
}

impl GameContext {
    pub fn is_photo(&self) -> bool {
        matches!(self, GameContext::Photo)
    }

    pub fn is_overworld(&self) -> bool {
        matches!(self, GameContext::Overworld)
    }
}

impl std::fmt::Display for GameContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameContext::Overworld => write!(f, "overworld"),
            GameContext::Photo => write!(f, "photo"),
        }
    }
}

/// Composite identity of an actor
///
/// `address_key` changes whenever the object moves; `stable_key` survives moves
/// but two actors may share it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    pub address_key: String,
    pub stable_key: String,
}

impl IdentityKey {
    pub fn new(address_key: impl Into<String>, stable_key: impl Into<String>) -> Self {
        Self {
            address_key: address_key.into(),
            stable_key: stable_key.into(),
        }
    }

    /// Build both keys from an actor's durable attributes and its current address
    pub fn from_parts(name: &str, kind: ActorKind, model_type: i32, address: ActorAddress) -> Self {
        let stable_key = format!("n{}_k{}_m{}", name, kind, model_type);
        let address_key = format!("{}_a{:X}", stable_key, address.raw());
        Self {
            address_key,
            stable_key,
        }
    }
}

/// Point-in-time read of one live actor's identity fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub address: ActorAddress,
    pub identity: IdentityKey,
    pub is_hidden: bool,
    pub is_photo_actor: bool,
}
