//! IdentityResolver - picks the live actor a stale pin should rebind to

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ActorSnapshot, IdentityKey, PinId};
use crate::registry::ClaimSnapshot;

/// How confidently a candidate matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchKind {
    /// Address-qualified key matched; the object never moved
    Exact,
    /// Only the stable key matched
    Stable,
}

/// A chosen candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub snapshot: ActorSnapshot,
    pub kind: MatchKind,
}

/// Two-pass identity matcher
///
/// Hidden actors and null addresses are never candidates. The stable-key pass
/// skips actors claimed by a different pin.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl IdentityResolver {
    pub fn new() -> Self {
        Self
    }

    /// Select the best live candidate for `target`, or `None`
    pub fn resolve(
        &self,
        pin: PinId,
        target: &IdentityKey,
        actors: &[ActorSnapshot],
        claims: &ClaimSnapshot,
    ) -> Option<Resolution> {
        debug!(%pin, address_key = %target.address_key, stable_key = %target.stable_key, candidates = actors.len(), "IdentityResolver::resolve: called");

        if let Some(snapshot) = actors
            .iter()
            .filter(|actor| Self::eligible(actor))
            .find(|actor| actor.identity.address_key == target.address_key)
        {
            debug!(%pin, address = %snapshot.address, "IdentityResolver::resolve: exact match");
            return Some(Resolution {
                snapshot: snapshot.clone(),
                kind: MatchKind::Exact,
            });
        }

        let stable = actors
            .iter()
            .filter(|actor| Self::eligible(actor))
            .filter(|actor| actor.identity.stable_key == target.stable_key)
            .find(|actor| match claims.claimant(actor.address) {
                Some(owner) if owner != pin => {
                    debug!(%pin, %owner, address = %actor.address, "IdentityResolver::resolve: candidate claimed by another pin");
                    false
                }
                _ => true,
            });

        match stable {
            Some(snapshot) => {
                debug!(%pin, address = %snapshot.address, "IdentityResolver::resolve: stable-key match");
                Some(Resolution {
                    snapshot: snapshot.clone(),
                    kind: MatchKind::Stable,
                })
            }
            None => {
                debug!(%pin, "IdentityResolver::resolve: no candidate");
                None
            }
        }
    }

    fn eligible(actor: &ActorSnapshot) -> bool {
        !actor.address.is_null() && !actor.is_hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActorAddress, ActorKind};
    use crate::events::EventBus;
    use crate::registry::PinRegistry;
    use std::sync::Arc;

    fn snapshot(name: &str, address: usize, hidden: bool) -> ActorSnapshot {
        let address = ActorAddress::new(address);
        ActorSnapshot {
            address,
            identity: IdentityKey::from_parts(name, ActorKind::Player, 0, address),
            is_hidden: hidden,
            is_photo_actor: false,
        }
    }

    fn target(name: &str, address: usize) -> IdentityKey {
        IdentityKey::from_parts(name, ActorKind::Player, 0, ActorAddress::new(address))
    }

    async fn claims_with(entries: &[(PinId, usize)]) -> ClaimSnapshot {
        let registry = PinRegistry::new(Arc::new(EventBus::new(4)));
        for (pin, address) in entries {
            registry.claim(*pin, ActorAddress::new(*address)).await.unwrap();
        }
        registry.claims().await
    }

    #[test]
    fn test_exact_match_wins_over_stable_match() {
        let pin = PinId::new();
        // Stable-key match listed first, exact match second
        let actors = vec![snapshot("Jane", 0x20, false), snapshot("Jane", 0x10, false)];

        let resolution = IdentityResolver::new()
            .resolve(pin, &target("Jane", 0x10), &actors, &ClaimSnapshot::default())
            .unwrap();

        assert_eq!(resolution.kind, MatchKind::Exact);
        assert_eq!(resolution.snapshot.address, ActorAddress::new(0x10));
    }

    #[test]
    fn test_stable_match_after_move() {
        let pin = PinId::new();
        let actors = vec![snapshot("Al", 0x30, false), snapshot("Jane", 0x20, false)];

        let resolution = IdentityResolver::new()
            .resolve(pin, &target("Jane", 0x10), &actors, &ClaimSnapshot::default())
            .unwrap();

        assert_eq!(resolution.kind, MatchKind::Stable);
        assert_eq!(resolution.snapshot.address, ActorAddress::new(0x20));
    }

    #[test]
    fn test_hidden_candidates_never_selected() {
        let pin = PinId::new();
        let actors = vec![snapshot("Jane", 0x10, true), snapshot("Jane", 0x20, true)];

        let resolution =
            IdentityResolver::new().resolve(pin, &target("Jane", 0x10), &actors, &ClaimSnapshot::default());
        assert!(resolution.is_none());
    }

    #[test]
    fn test_hidden_exact_falls_through_to_visible_stable() {
        let pin = PinId::new();
        let actors = vec![snapshot("Jane", 0x10, true), snapshot("Jane", 0x20, false)];

        let resolution = IdentityResolver::new()
            .resolve(pin, &target("Jane", 0x10), &actors, &ClaimSnapshot::default())
            .unwrap();
        assert_eq!(resolution.kind, MatchKind::Stable);
        assert_eq!(resolution.snapshot.address, ActorAddress::new(0x20));
    }

    #[test]
    fn test_null_address_never_selected() {
        let pin = PinId::new();
        let mut null = snapshot("Jane", 0x10, false);
        null.address = ActorAddress::NULL;

        let resolution =
            IdentityResolver::new().resolve(pin, &target("Jane", 0x10), &[null], &ClaimSnapshot::default());
        assert!(resolution.is_none());
    }

    #[tokio::test]
    async fn test_claimed_candidate_skipped() {
        let pin = PinId::new();
        let other = PinId::new();
        let actors = vec![snapshot("Guard", 0x20, false), snapshot("Guard", 0x30, false)];
        let claims = claims_with(&[(other, 0x20)]).await;

        let resolution = IdentityResolver::new()
            .resolve(pin, &target("Guard", 0x10), &actors, &claims)
            .unwrap();
        assert_eq!(resolution.snapshot.address, ActorAddress::new(0x30));
    }

    #[tokio::test]
    async fn test_only_candidate_claimed_by_other_pin() {
        let pin = PinId::new();
        let other = PinId::new();
        let actors = vec![snapshot("Guard", 0x20, false)];
        let claims = claims_with(&[(other, 0x20)]).await;

        let resolution = IdentityResolver::new().resolve(pin, &target("Guard", 0x10), &actors, &claims);
        assert!(resolution.is_none());
    }

    #[tokio::test]
    async fn test_own_claim_is_not_a_conflict() {
        let pin = PinId::new();
        let actors = vec![snapshot("Guard", 0x20, false)];
        let claims = claims_with(&[(pin, 0x20)]).await;

        let resolution = IdentityResolver::new()
            .resolve(pin, &target("Guard", 0x10), &actors, &claims)
            .unwrap();
        assert_eq!(resolution.snapshot.address, ActorAddress::new(0x20));
    }

    #[test]
    fn test_empty_table() {
        let resolution =
            IdentityResolver::new().resolve(PinId::new(), &target("Jane", 0x10), &[], &ClaimSnapshot::default());
        assert!(resolution.is_none());
    }
}
