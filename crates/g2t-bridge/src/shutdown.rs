//! Process-wide "done" latch.
//!
//! Set once on an unrecoverable condition; `main` waits on it and exits.
//! Later triggers keep the first reason.

use std::fmt;

use tokio::sync::watch;

/// Why the bridge is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The wake-up controller ran out of auth retries.
    RetriesExhausted,
    /// The broker stayed unreachable past the reconnect budget.
    BusDisconnected,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetriesExhausted => write!(f, "wake-up retries exhausted"),
            Self::BusDisconnected => write!(f, "MQTT connection lost"),
        }
    }
}

/// Cloneable handle to the shared latch.
#[derive(Clone)]
pub struct Shutdown {
    tx: watch::Sender<Option<ShutdownReason>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Fire the latch. Returns false if it had already fired.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.tx.borrow()
    }

    /// Wait until the latch fires.
    pub async fn wait(&self) -> ShutdownReason {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(reason) = *rx.borrow_and_update() {
                return reason;
            }
            // The sender lives in `self`, so this only errors if it is gone.
            if rx.changed().await.is_err() {
                return ShutdownReason::BusDisconnected;
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
