//! Pin ID generation
//!
//! Every pinned handle gets a time-ordered UUID so event logs sort naturally.
//! Display uses the full UUID; `short()` gives a 6-char prefix for terminals.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one pinned handle, stable for the handle's whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinId(Uuid);

impl PinId {
    /// Generate a new pin ID
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the hex prefix (first 6 chars)
    pub fn short(&self) -> String {
        self.0.simple().to_string().chars().take(6).collect()
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PinId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PinId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_ids_are_unique() {
        let a = PinId::new();
        let b = PinId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_prefix() {
        let id = PinId::new();
        let short = id.short();
        assert_eq!(short.len(), 6);
        assert!(id.as_uuid().simple().to_string().starts_with(&short));
    }

    #[test]
    fn test_parse_round_trip() {
        let id = PinId::new();
        let parsed: PinId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<PinId>().is_err());
    }
}
