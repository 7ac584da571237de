//! Exclusivity gate: at most one wake sequence in flight.
//!
//! Shared by the charger watcher and the pre-wakeup scheduler. A trigger
//! that finds the gate held is dropped, never queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;

use crate::controller::{WakeHandler, WakeOutcome};
use crate::shutdown::{Shutdown, ShutdownReason};

#[derive(Debug, Default)]
pub struct WakeGate {
    busy: AtomicBool,
}

impl WakeGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Take the gate, or `None` while another wake sequence holds it.
    pub fn try_acquire(self: &Arc<Self>) -> Option<WakeGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| WakeGuard {
                gate: Arc::clone(self),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the gate on drop.
#[derive(Debug)]
pub struct WakeGuard {
    gate: Arc<WakeGate>,
}

impl Drop for WakeGuard {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

/// Run one wake sequence while holding `guard`.
///
/// Exhaustion fires the shutdown latch.
pub async fn run_guarded(
    handler: &dyn WakeHandler,
    guard: WakeGuard,
    shutdown: &Shutdown,
) -> WakeOutcome {
    let outcome = handler.handle_wake_up().await;
    drop(guard);

    if outcome == WakeOutcome::Exhausted {
        tracing::error!("wake-up retries exhausted, shutting down");
        shutdown.trigger(ShutdownReason::RetriesExhausted);
    }
    outcome
}

/// Spawn [`run_guarded`] so the caller (the MQTT loop) keeps polling.
pub fn spawn_guarded(
    handler: Arc<dyn WakeHandler>,
    guard: WakeGuard,
    shutdown: Shutdown,
) -> JoinHandle<WakeOutcome> {
    tokio::spawn(async move { run_guarded(handler.as_ref(), guard, &shutdown).await })
}
