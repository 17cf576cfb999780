//! Event bus for pinned-handle observability
//!
//! Pinned handles publish every retarget, derived-field change, selection change
//! and backup operation to a shared broadcast bus. Consumers (the CLI printer,
//! the JSONL history logger, a UI) subscribe independently.
//!
//! ```text
//!   PinnedHandle ──┐
//!   PinRegistry  ──┼──▶ EventBus (tokio broadcast) ──▶ CLI printer
//!   TargetService ─┘                                └─▶ EventLogger (.jsonl)
//! ```
//!
//! See [`PinEvent`] for the vocabulary.

mod bus;
mod logger;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, PinEmitter};
pub use logger::{EventLogger, GLOBAL_LOG_DIR, read_pin_events, spawn_event_logger};
pub use types::{EventLogEntry, PinEvent, PinProperty};
