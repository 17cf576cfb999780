//! Backup error types

use thiserror::Error;

use crate::process::MemoryError;

/// Errors from capturing or applying an actor backup
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Backup has no '{0}' section")]
    MissingSection(&'static str),

    #[error("Actor state is not a JSON object")]
    MalformedState,

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActorAddress;

    #[test]
    fn test_from_memory_error() {
        let err: BackupError = MemoryError::Unreadable(ActorAddress::new(0x10)).into();
        assert!(matches!(err, BackupError::Memory(_)));
        assert_eq!(err.to_string(), "Memory error: Actor at 0x10 is unreadable");
    }

    #[test]
    fn test_missing_section_display() {
        assert_eq!(
            BackupError::MissingSection("equipment").to_string(),
            "Backup has no 'equipment' section"
        );
    }
}
