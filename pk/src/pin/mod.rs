//! Pinned handles
//!
//! A [`PinnedHandle`] is the long-lived reference a user holds to one actor in
//! the target process. The process frees and reallocates actor objects, moves
//! them between the overworld and the photo context, and hides them at will;
//! the handle notices when its binding goes stale and re-acquires the right
//! object through the [`IdentityResolver`]:
//!
//! 1. Exact match on the address-qualified key (visible actors only)
//! 2. Stable-key match, skipping actors another pin already claims
//!
//! A retarget across the photo boundary restores the backup captured when the
//! process entered photo mode.

mod config;
mod environment;
mod handle;
mod resolver;
mod state;

pub use config::PinConfig;
pub use environment::PinEnvironment;
pub use handle::PinnedHandle;
pub use resolver::{IdentityResolver, MatchKind, Resolution};
pub use state::{PinState, PinSummary, RetargetReason};
