//! Target service
//!
//! Owns the set of pinned handles, creates and removes pins, keeps a
//! selection, and drives every handle's tick on a fixed interval.

mod error;
mod service;
mod ticker;

pub use error::PinError;
pub use service::TargetService;
pub use ticker::PinTicker;
