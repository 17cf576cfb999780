//! Memory access error types

use thiserror::Error;

use crate::domain::ActorAddress;

/// Errors from reading or writing an actor in the target process
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Actor at {0} is unreadable")]
    Unreadable(ActorAddress),

    #[error("Cannot bind a view to the null address")]
    NullAddress,

    #[error("View for {0} has been disposed")]
    Disposed(ActorAddress),

    #[error("No target process is attached")]
    Detached,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MemoryError::Unreadable(ActorAddress::new(0xBEEF));
        assert_eq!(err.to_string(), "Actor at 0xBEEF is unreadable");
    }
}
