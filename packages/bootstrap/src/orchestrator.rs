//! Bootstrap orchestrator.
//!
//! The orchestrator drives one bootstrap attempt through its states:
//!
//! ```text
//! Idle → Fetching → Instantiating → AwaitingReady → Ready
//!          │             │               │
//!          └─────────────┴───────────────┴──────→ Failed
//! ```
//!
//! State, progress, and the engine version are published on a
//! [`tokio::sync::watch`] channel so the hosting page can render the loading
//! screen and switch to the editor once `Ready` is observed.
//!
//! There is one attempt per orchestrator and nothing is retried. Dropping the
//! orchestrator detaches the readiness hook; it does not abort a fetch or an
//! engine that is already running.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;

use crate::capability::Capabilities;
use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use crate::fetch::ModuleFetcher;
use crate::readiness::{readiness, ReadinessHook, ReadinessSignal};
use crate::runtime::RuntimeHost;

/// Lifecycle state of a bootstrap attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Idle,
    Fetching,
    Instantiating,
    AwaitingReady,
    Ready,
    Failed,
}

impl BootstrapState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BootstrapState::Ready | BootstrapState::Failed)
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootstrapState::Idle => "idle",
            BootstrapState::Fetching => "fetching",
            BootstrapState::Instantiating => "instantiating",
            BootstrapState::AwaitingReady => "awaiting-ready",
            BootstrapState::Ready => "ready",
            BootstrapState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Snapshot published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapStatus {
    pub state: BootstrapState,

    /// Download progress in `[0, 1]`, never decreasing.
    pub progress: f64,

    /// Engine version, set when `Ready` and empty otherwise.
    pub version: String,
}

impl Default for BootstrapStatus {
    fn default() -> Self {
        Self {
            state: BootstrapState::Idle,
            progress: 0.0,
            version: String::new(),
        }
    }
}

/// Sequences fetch, launch, readiness, and capability checks.
pub struct Orchestrator<F, H> {
    fetcher: F,
    host: H,
    module_path: String,
    ready_timeout: Option<Duration>,
    status: watch::Sender<BootstrapStatus>,
    hook: Option<ReadinessHook>,
    signal: ReadinessSignal,
    capabilities: Option<Capabilities>,
}

impl<F: ModuleFetcher, H: RuntimeHost> Orchestrator<F, H> {
    pub fn new(fetcher: F, host: H, config: &BootstrapConfig) -> Self {
        Self::with_module(
            fetcher,
            host,
            config.module_path.clone(),
            config.ready_timeout(),
        )
    }

    pub fn with_module(
        fetcher: F,
        host: H,
        module_path: impl Into<String>,
        ready_timeout: Option<Duration>,
    ) -> Self {
        // Registered before anything runs, so an engine that signals during
        // its entry point is never missed.
        let (hook, signal) = readiness();
        let (status, _) = watch::channel(BootstrapStatus::default());

        Self {
            fetcher,
            host,
            module_path: module_path.into(),
            ready_timeout,
            status,
            hook: Some(hook),
            signal,
            capabilities: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<BootstrapStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> BootstrapStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> BootstrapState {
        self.status.borrow().state
    }

    /// The confirmed capability surface, present only once `Ready`.
    pub fn capabilities(&self) -> Option<&Capabilities> {
        self.capabilities.as_ref()
    }

    /// Detach the readiness hook. Later notifications from the engine are
    /// dropped and a pending `run` fails with `SignalDetached`.
    pub fn detach(&mut self) {
        self.signal.detach();
    }

    /// Run the bootstrap attempt to a terminal state.
    pub async fn run(&mut self) -> Result<Capabilities> {
        if self.state() != BootstrapState::Idle {
            return Err(BootstrapError::AlreadyStarted);
        }

        match self.bootstrap().await {
            Ok(capabilities) => {
                tracing::info!(version = capabilities.version(), "engine ready");
                self.capabilities = Some(capabilities.clone());
                self.status.send_modify(|s| {
                    s.state = BootstrapState::Ready;
                    s.version = capabilities.version().to_string();
                });
                Ok(capabilities)
            }
            Err(e) => {
                let phase = self.state();
                tracing::error!(
                    %phase,
                    error = %e,
                    validator_missing = e.is_validator_missing(),
                    "engine bootstrap failed"
                );
                self.transition(BootstrapState::Failed);
                Err(e)
            }
        }
    }

    async fn bootstrap(&mut self) -> Result<Capabilities> {
        self.transition(BootstrapState::Fetching);
        let status = &self.status;
        let relay = |fraction: f64| {
            status.send_if_modified(|s| {
                if fraction > s.progress {
                    s.progress = fraction.min(1.0);
                    true
                } else {
                    false
                }
            });
        };
        let binary = self.fetcher.fetch(&self.module_path, &relay).await?;
        tracing::debug!(bytes = binary.len(), "module binary received");

        self.transition(BootstrapState::Instantiating);
        let hook = self.hook.take().ok_or(BootstrapError::SignalDetached)?;
        let engine = self.host.launch(binary, hook).await?;

        self.transition(BootstrapState::AwaitingReady);
        self.signal.wait(self.ready_timeout).await?;
        tracing::info!("engine signalled readiness");

        Capabilities::confirm(engine)
    }

    fn transition(&self, state: BootstrapState) {
        tracing::debug!(%state, "bootstrap transition");
        self.status.send_modify(|s| s.state = state);
    }
}
