//! Event Logger - persists pin events to JSONL files
//!
//! Subscribes to the EventBus and appends every event to a per-pin history file
//! at `{pins_dir}/{pin-id}/events.jsonl`. Events not tied to a pin (a cleared
//! selection) go to `{pins_dir}/_global/events.jsonl`.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyre::eyre;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use super::bus::EventBus;
use super::types::{EventLogEntry, PinEvent};

/// Directory name for events that are not about a single pin
pub const GLOBAL_LOG_DIR: &str = "_global";

/// Event logger that writes events to JSONL files
pub struct EventLogger {
    /// Base directory for pin histories
    pins_dir: PathBuf,
    /// Open file writers per pin directory name
    writers: HashMap<String, BufWriter<File>>,
}

impl EventLogger {
    /// Create a new event logger
    pub fn new(pins_dir: impl AsRef<Path>) -> Self {
        let pins_dir = pins_dir.as_ref().to_path_buf();
        debug!(?pins_dir, "EventLogger::new: creating logger");
        Self {
            pins_dir,
            writers: HashMap::new(),
        }
    }

    /// Create a logger with the default directory (`<data_local_dir>/pinkeep/pins`)
    pub fn with_default_path() -> eyre::Result<Self> {
        let data_dir = dirs::data_local_dir().ok_or_else(|| eyre!("Could not determine data directory"))?;
        let pins_dir = data_dir.join("pinkeep").join("pins");
        fs::create_dir_all(&pins_dir)?;
        Ok(Self::new(pins_dir))
    }

    fn log_key(event: &PinEvent) -> String {
        event
            .pin_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| GLOBAL_LOG_DIR.to_string())
    }

    /// Append an event to its pin's log file
    pub fn write_event(&mut self, event: &PinEvent) -> eyre::Result<()> {
        let key = Self::log_key(event);
        debug!(%key, event_type = event.event_type(), "EventLogger::write_event");

        if !self.writers.contains_key(&key) {
            let pin_dir = self.pins_dir.join(&key);
            fs::create_dir_all(&pin_dir)?;

            let log_path = pin_dir.join("events.jsonl");
            debug!(?log_path, "EventLogger: creating new log file");

            let file = OpenOptions::new().create(true).append(true).open(&log_path)?;
            self.writers.insert(key.clone(), BufWriter::new(file));
        }
        let writer = self
            .writers
            .get_mut(&key)
            .ok_or_else(|| eyre!("No writer for {}", key))?;

        let entry = EventLogEntry::new(event.clone());
        let json = serde_json::to_string(&entry)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        Ok(())
    }

    /// Close the writer for a pin (e.g., when it is unpinned)
    pub fn close_pin(&mut self, key: &str) {
        debug!(%key, "EventLogger::close_pin");
        if let Some(mut writer) = self.writers.remove(key) {
            let _ = writer.flush();
        }
    }

    /// Consume events until every sender on the bus is gone
    async fn drain(&mut self, mut rx: broadcast::Receiver<PinEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let key = Self::log_key(&event);
                    let is_unpinned = matches!(event, PinEvent::Unpinned { .. });

                    if let Err(e) = self.write_event(&event) {
                        error!(%key, error = %e, "EventLogger: failed to write event");
                    }

                    if is_unpinned {
                        self.close_pin(&key);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "EventLogger: lagged behind, missed events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("EventLogger: channel closed, shutting down");
                    break;
                }
            }
        }

        for (key, mut writer) in self.writers.drain() {
            debug!(%key, "EventLogger: flushing writer on shutdown");
            let _ = writer.flush();
        }
    }
}

/// Read a pin's event history
pub fn read_pin_events(pins_dir: impl AsRef<Path>, key: &str) -> eyre::Result<Vec<EventLogEntry>> {
    let log_path = pins_dir.as_ref().join(key).join("events.jsonl");
    debug!(?log_path, "read_pin_events: reading log file");

    if !log_path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&log_path)?;
    let mut entries = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EventLogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(line, error = %e, "read_pin_events: failed to parse line");
            }
        }
    }

    debug!(count = entries.len(), "read_pin_events: loaded entries");
    Ok(entries)
}

/// Spawn the event logger as a background task
///
/// Uses `pins_dir` when given, otherwise the default data directory.
pub fn spawn_event_logger(
    event_bus: Arc<EventBus>,
    pins_dir: Option<&Path>,
) -> eyre::Result<tokio::task::JoinHandle<()>> {
    let logger = match pins_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            EventLogger::new(dir)
        }
        None => EventLogger::with_default_path()?,
    };
    // Subscribe before returning so no event emitted after spawn is missed
    let rx = event_bus.subscribe();
    Ok(tokio::spawn(async move {
        let mut logger = logger;
        logger.drain(rx).await;
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActorAddress, PinId};
    use crate::events::PinProperty;
    use tempfile::tempdir;

    #[test]
    fn test_write_event_creates_pin_file() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path());
        let id = PinId::new();

        logger
            .write_event(&PinEvent::Pinned {
                pin_id: id,
                address: ActorAddress::new(0x10),
                name: Some("Al".to_string()),
            })
            .unwrap();

        let log_path = temp.path().join(id.to_string()).join("events.jsonl");
        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("Pinned"));
        assert!(content.contains("Al"));
    }

    #[test]
    fn test_selection_cleared_goes_to_global_log() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path());

        logger.write_event(&PinEvent::SelectionChanged { pin_id: None }).unwrap();

        assert!(temp.path().join(GLOBAL_LOG_DIR).join("events.jsonl").exists());
    }

    #[test]
    fn test_read_pin_events() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path());
        let id = PinId::new();

        logger
            .write_event(&PinEvent::PropertyChanged {
                pin_id: id,
                property: PinProperty::Initials,
            })
            .unwrap();
        logger.write_event(&PinEvent::Unpinned { pin_id: id }).unwrap();

        let entries = read_pin_events(temp.path(), &id.to_string()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event.event_type(), "PropertyChanged");
        assert_eq!(entries[1].event.event_type(), "Unpinned");
    }

    #[test]
    fn test_read_nonexistent_pin() {
        let temp = tempdir().unwrap();
        let entries = read_pin_events(temp.path(), "nonexistent").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_close_pin() {
        let temp = tempdir().unwrap();
        let mut logger = EventLogger::new(temp.path());
        let id = PinId::new();

        logger.write_event(&PinEvent::Unpinned { pin_id: id }).unwrap();
        assert!(logger.writers.contains_key(&id.to_string()));
        logger.close_pin(&id.to_string());
        assert!(!logger.writers.contains_key(&id.to_string()));
    }

    #[tokio::test]
    async fn test_spawned_logger_persists_bus_events() {
        let temp = tempdir().unwrap();
        let bus = Arc::new(EventBus::new(16));
        let handle = spawn_event_logger(bus.clone(), Some(temp.path())).unwrap();
        let id = PinId::new();

        bus.emit(PinEvent::BackupCaptured {
            pin_id: id,
            address: ActorAddress::new(0x10),
        });
        bus.emit(PinEvent::Unpinned { pin_id: id });

        // Dropping the last sender closes the channel and stops the logger
        drop(bus);
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        let entries = read_pin_events(temp.path(), &id.to_string()).unwrap();
        assert_eq!(entries.len(), 2);
    }
}
