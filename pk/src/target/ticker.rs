//! PinTicker - drives every pin's tick on a fixed interval

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::service::TargetService;

/// Periodic tick loop for a [`TargetService`]
pub struct PinTicker {
    service: Arc<TargetService>,
    interval: Duration,
}

impl PinTicker {
    pub fn new(service: Arc<TargetService>, interval: Duration) -> Self {
        debug!(?interval, "PinTicker::new: called");
        Self { service, interval }
    }

    /// Build a ticker using the service's configured interval
    pub fn from_config(service: Arc<TargetService>) -> Self {
        let interval = service.environment().config.tick_interval();
        Self::new(service, interval)
    }

    /// Run until `shutdown` becomes true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "PinTicker started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.service.tick_all().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("PinTicker::run: shutdown requested");
                        break;
                    }
                }
            }
        }

        info!("PinTicker stopped");
    }

    /// Spawn [`run`](Self::run) as a background task
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        debug!("PinTicker::spawn: called");
        tokio::spawn(self.run(shutdown))
    }
}
