//! One-shot readiness signal.
//!
//! The engine announces that its capability surface is usable by firing a
//! [`ReadinessHook`] exactly once. The orchestrator owns the matching
//! [`ReadinessSignal`] and awaits it.
//!
//! Detaching the signal (explicitly or by dropping it) removes the hook's
//! sender, so a late notification from the engine is a no-op rather than a
//! write into a disposed context.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::{BootstrapError, Result};

type Slot = Arc<Mutex<Option<oneshot::Sender<()>>>>;

/// Create a connected hook/signal pair.
pub fn readiness() -> (ReadinessHook, ReadinessSignal) {
    let (tx, rx) = oneshot::channel();
    let slot: Slot = Arc::new(Mutex::new(Some(tx)));

    let hook = ReadinessHook { slot: slot.clone() };
    let signal = ReadinessSignal { slot, rx: Some(rx) };
    (hook, signal)
}

/// The engine-facing half: fired once when the engine is ready.
#[derive(Debug, Clone)]
pub struct ReadinessHook {
    slot: Slot,
}

impl ReadinessHook {
    /// Announce readiness.
    ///
    /// Returns `true` if a waiting signal observed the notification. Repeat
    /// calls and calls after detachment return `false`.
    pub fn notify(&self) -> bool {
        let sender = self.slot.lock().unwrap().take();
        match sender {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Whether the hook can still deliver a notification.
    pub fn is_attached(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }
}

/// The orchestrator-facing half.
#[derive(Debug)]
pub struct ReadinessSignal {
    slot: Slot,
    rx: Option<oneshot::Receiver<()>>,
}

impl ReadinessSignal {
    /// Wait for the engine to signal readiness, optionally bounded.
    pub async fn wait(&mut self, timeout: Option<Duration>) -> Result<()> {
        let rx = self.rx.as_mut().ok_or(BootstrapError::SignalDetached)?;

        let received = match timeout {
            None => rx.await,
            Some(limit) => tokio::time::timeout(limit, rx)
                .await
                .map_err(|_| BootstrapError::ReadyTimeout(limit))?,
        };

        self.rx = None;
        received.map_err(|_| BootstrapError::SignalDetached)
    }

    /// Remove the hook so later notifications are dropped.
    pub fn detach(&mut self) {
        if self.slot.lock().unwrap().take().is_some() {
            tracing::debug!("readiness hook detached");
        }
    }
}

impl Drop for ReadinessSignal {
    fn drop(&mut self) {
        self.detach();
    }
}
