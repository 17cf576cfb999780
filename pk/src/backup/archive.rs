//! Backup record and the archive that captures/applies it

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::error::BackupError;
use crate::domain::{ActorAddress, ActorKind};
use crate::process::ActorView;

/// Which part of a backup to write back onto an actor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyMode {
    #[default]
    All,
    Appearance,
    Equipment,
}

impl ApplyMode {
    /// Top-level state section this mode touches; `None` means the whole document
    pub fn section(&self) -> Option<&'static str> {
        match self {
            ApplyMode::All => None,
            ApplyMode::Appearance => Some("appearance"),
            ApplyMode::Equipment => Some("equipment"),
        }
    }
}

impl std::str::FromStr for ApplyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ApplyMode::All),
            "appearance" => Ok(ApplyMode::Appearance),
            "equipment" => Ok(ApplyMode::Equipment),
            _ => Err(format!("Unknown apply mode: {}", s)),
        }
    }
}

/// Owned copy of an actor's full state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorBackup {
    pub captured_at: DateTime<Utc>,
    /// Address the state was read from
    pub source: ActorAddress,
    pub name: Option<String>,
    pub kind: ActorKind,
    pub state: Value,
}

/// Captures and applies full actor state
///
/// The state document format belongs to the implementation; the core only moves
/// backups between capture and apply.
#[async_trait]
pub trait StateArchive: Send + Sync {
    /// Read the view's full state into an owned backup
    async fn capture(&self, view: &dyn ActorView) -> Result<ActorBackup, BackupError>;

    /// Write a backup (or the part selected by `mode`) onto the view
    async fn apply(&self, backup: &ActorBackup, view: &dyn ActorView, mode: ApplyMode) -> Result<(), BackupError>;
}

/// Archive that round-trips the view's own state document
#[derive(Debug, Default, Clone)]
pub struct ViewArchive;

impl ViewArchive {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StateArchive for ViewArchive {
    async fn capture(&self, view: &dyn ActorView) -> Result<ActorBackup, BackupError> {
        debug!(address = %view.address(), "ViewArchive::capture: called");
        let state = view.read_state()?;
        Ok(ActorBackup {
            captured_at: Utc::now(),
            source: view.address(),
            name: view.name(),
            kind: view.kind(),
            state,
        })
    }

    async fn apply(&self, backup: &ActorBackup, view: &dyn ActorView, mode: ApplyMode) -> Result<(), BackupError> {
        debug!(address = %view.address(), source = %backup.source, ?mode, "ViewArchive::apply: called");
        let payload = match mode.section() {
            None => backup.state.clone(),
            Some(section) => {
                let saved = backup
                    .state
                    .get(section)
                    .cloned()
                    .ok_or(BackupError::MissingSection(section))?;
                let mut current = view.read_state()?;
                let fields = current.as_object_mut().ok_or(BackupError::MalformedState)?;
                fields.insert(section.to_string(), saved);
                current
            }
        };
        view.write_state(payload)?;
        Ok(())
    }
}
