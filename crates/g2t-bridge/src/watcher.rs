//! Charge-permission edge detector.
//!
//! Owned by the MQTT loop task, so `previous` has a single writer. Each
//! decoded status first refreshes the shared snapshot the scheduler reads,
//! then goes through admission control and rising-edge detection.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use g2t_protocol::charger::ChargerStatus;

use crate::controller::{WakeHandler, WakeOutcome};
use crate::gate::{WakeGate, spawn_guarded};
use crate::shutdown::Shutdown;

/// Last decoded charger status, written by the watcher only.
pub type SharedChargerStatus = Arc<RwLock<Option<ChargerStatus>>>;

/// What the watcher did with one status message.
#[derive(Debug)]
pub enum WatchOutcome {
    /// First message since start; state recorded, nothing triggered.
    Primed,
    /// No rising edge.
    Unchanged,
    /// Rising edge; a wake sequence is running in the returned task.
    Triggered(JoinHandle<WakeOutcome>),
    /// A wake sequence was already in flight. `previous` is untouched.
    Dropped,
}

pub struct ChargeStateWatcher {
    previous: Option<bool>,
    gate: Arc<WakeGate>,
    handler: Arc<dyn WakeHandler>,
    latest: SharedChargerStatus,
    shutdown: Shutdown,
}

impl ChargeStateWatcher {
    pub fn new(
        gate: Arc<WakeGate>,
        handler: Arc<dyn WakeHandler>,
        latest: SharedChargerStatus,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            previous: None,
            gate,
            handler,
            latest,
            shutdown,
        }
    }

    /// Last processed "charging allowed" value, `None` before the first message.
    pub fn previous(&self) -> Option<bool> {
        self.previous
    }

    pub async fn on_status(&mut self, status: ChargerStatus) -> WatchOutcome {
        let current = status.charging_allowed();
        *self.latest.write().await = Some(status);

        let Some(previous) = self.previous else {
            tracing::info!(allowed = current, "initial charger state");
            self.previous = Some(current);
            return WatchOutcome::Primed;
        };

        if self.gate.is_busy() {
            tracing::debug!(allowed = current, "wake-up in flight, dropping status");
            return WatchOutcome::Dropped;
        }

        self.previous = Some(current);

        if !current || previous {
            return WatchOutcome::Unchanged;
        }

        let Some(guard) = self.gate.try_acquire() else {
            // Scheduler took the gate between the check and here.
            return WatchOutcome::Dropped;
        };

        tracing::info!("charging enabled, waking up vehicle");
        WatchOutcome::Triggered(spawn_guarded(
            Arc::clone(&self.handler),
            guard,
            self.shutdown.clone(),
        ))
    }
}
