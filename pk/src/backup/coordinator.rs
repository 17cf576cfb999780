//! BackupCoordinator - per-pin backup slot with best-effort capture/restore

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::archive::{ActorBackup, ApplyMode, StateArchive};
use crate::events::PinEmitter;
use crate::process::ActorView;

/// Holds one pin's most recent backup and moves it through the archive
///
/// Callers pass the live binding (or `None` when the pin is unbound or invalid);
/// nothing here ever returns an error.
pub struct BackupCoordinator {
    archive: Arc<dyn StateArchive>,
    emitter: PinEmitter,
    slot: Mutex<Option<ActorBackup>>,
    captured: AtomicU64,
    restored: AtomicU64,
}

impl BackupCoordinator {
    pub fn new(archive: Arc<dyn StateArchive>, emitter: PinEmitter) -> Self {
        debug!(pin_id = %emitter.pin_id(), "BackupCoordinator::new: called");
        Self {
            archive,
            emitter,
            slot: Mutex::new(None),
            captured: AtomicU64::new(0),
            restored: AtomicU64::new(0),
        }
    }

    /// Capture the binding's full state, replacing any previous backup
    ///
    /// Returns whether a backup was stored.
    pub async fn snapshot(&self, binding: Option<Arc<dyn ActorView>>) -> bool {
        let pin_id = self.emitter.pin_id();
        debug!(%pin_id, bound = binding.is_some(), "BackupCoordinator::snapshot: called");

        let Some(view) = binding else {
            warn!(%pin_id, "Unable to create actor backup, pinned actor has no live binding");
            self.emitter.backup_skipped("snapshot: no live binding");
            return false;
        };

        match self.archive.capture(view.as_ref()).await {
            Ok(backup) => {
                let address = backup.source;
                *self.slot.lock().await = Some(backup);
                self.captured.fetch_add(1, Ordering::SeqCst);
                info!(%pin_id, %address, "Captured actor backup");
                self.emitter.backup_captured(address);
                true
            }
            Err(e) => {
                warn!(%pin_id, error = %e, "Failed to capture actor backup");
                self.emitter.backup_skipped(format!("snapshot: {}", e));
                false
            }
        }
    }

    /// Apply the stored backup onto the binding
    ///
    /// No backup is a silent no-op. Returns whether anything was applied.
    pub async fn restore(&self, binding: Option<Arc<dyn ActorView>>, mode: ApplyMode) -> bool {
        let pin_id = self.emitter.pin_id();
        debug!(%pin_id, bound = binding.is_some(), ?mode, "BackupCoordinator::restore: called");

        let Some(backup) = self.slot.lock().await.clone() else {
            debug!(%pin_id, "BackupCoordinator::restore: no backup, nothing to do");
            return false;
        };

        let Some(view) = binding else {
            warn!(%pin_id, "Unable to restore actor backup, pinned actor has no live binding");
            self.emitter.backup_skipped("restore: no live binding");
            return false;
        };

        let address = view.address();
        match self.archive.apply(&backup, view.as_ref(), mode).await {
            Ok(()) => {
                self.restored.fetch_add(1, Ordering::SeqCst);
                info!(%pin_id, source = %backup.source, %address, "Restored actor backup");
                self.emitter.backup_restored(address);
                true
            }
            Err(e) => {
                warn!(%pin_id, %address, error = %e, "Failed to restore actor backup");
                self.emitter.backup_skipped(format!("restore: {}", e));
                false
            }
        }
    }

    /// Copy of the stored backup
    pub async fn backup(&self) -> Option<ActorBackup> {
        self.slot.lock().await.clone()
    }

    pub async fn has_backup(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Number of backups captured so far
    pub fn captured_count(&self) -> u64 {
        self.captured.load(Ordering::SeqCst)
    }

    /// Number of backups successfully applied so far
    pub fn restored_count(&self) -> u64 {
        self.restored.load(Ordering::SeqCst)
    }
}
