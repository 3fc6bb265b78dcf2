//! # xray-editor-bootstrap
//!
//! Engine bootstrap lifecycle and validation bridge for the Xray config
//! editor.
//!
//! The editor validates proxy configurations with a compiled engine that is
//! delivered as a binary module and loaded at runtime. This crate owns
//! everything between "the page opened" and "the user sees a validation
//! result":
//!
//! ```text
//! Orchestrator ──fetch──▶ ModuleFetcher ──bytes──▶ RuntimeHost ──▶ EngineInstance
//!      │                                               │
//!      │◀──────────── ReadinessSignal ◀── hook ────────┘
//!      │
//!      └──▶ Capabilities ──▶ ValidationBridge ──▶ EditorSession
//! ```
//!
//! ## Bootstrap
//!
//! An [`Orchestrator`] runs one attempt through
//! `Idle → Fetching → Instantiating → AwaitingReady → Ready`, failing into
//! `Failed` from any step. It publishes a [`BootstrapStatus`] that the page
//! turns into a [`PageView`]:
//!
//! ```ignore
//! use xray_editor_bootstrap::{BootstrapConfig, HttpFetcher, Orchestrator, PageView};
//!
//! let config = BootstrapConfig::from_file("bootstrap.json")?;
//! let fetcher = HttpFetcher::from_config(&config)?;
//! let mut orchestrator = Orchestrator::new(fetcher, host, &config);
//!
//! let mut status = orchestrator.subscribe();
//! tokio::spawn(async move {
//!     while status.changed().await.is_ok() {
//!         render(PageView::from_status(&status.borrow()));
//!     }
//! });
//!
//! let capabilities = orchestrator.run().await?;
//! ```
//!
//! The runtime host is a trait; `xray-editor-wasm-host` provides the
//! Wasmtime implementation.
//!
//! ## Validation
//!
//! A [`Capabilities`] handle exists only once the engine is ready and its
//! validate-config capability has been confirmed, so validation cannot run
//! earlier. The [`ValidationBridge`] turns editor text into a line such as
//! `14:02:31 | Xray Core 1.8.0 | Configuration valid` plus a validity flag,
//! and never lets an error escape.
//!
//! ## Schema diagnostics
//!
//! [`spawn_diagnostics_setup`] fetches the Xray JSON schema and registers it
//! with the editor's JSON diagnostics. It is independent of the bootstrap:
//! failures are logged and otherwise ignored.

pub mod bridge;
pub mod capability;
pub mod config;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod page;
pub mod readiness;
pub mod runtime;
pub mod schema;
pub mod template;

pub use bridge::{format_result, EditorText, ValidationBridge, ValidationReport, ValidationSink};
pub use capability::{Capabilities, Capability, CapabilityStatus, EngineInstance};
pub use config::BootstrapConfig;
pub use error::{BootstrapError, ConfigError, EngineError, FetchError, Result, SchemaError};
pub use fetch::{HttpFetcher, ModuleBinary, ModuleFetcher, ProgressFn, ProgressTracker};
pub use orchestrator::{BootstrapState, BootstrapStatus, Orchestrator};
pub use page::{EditorSession, PageView, TextBuffer, ValidationDisplay};
pub use readiness::{readiness, ReadinessHook, ReadinessSignal};
pub use runtime::RuntimeHost;
pub use schema::{
    setup_diagnostics, spawn_diagnostics_setup, DiagnosticsOptions, DiagnosticsRegistry,
    SchemaSource,
};
pub use template::DEFAULT_CONFIG;
