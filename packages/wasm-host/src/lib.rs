//! # xray-editor-wasm-host
//!
//! Wasmtime [`RuntimeHost`](xray_editor_bootstrap::RuntimeHost) for the Xray
//! validation engine.
//!
//! The engine is a core WebAssembly module speaking a small ABI:
//!
//! | Direction | Name                       | Signature               |
//! |-----------|----------------------------|-------------------------|
//! | import    | `env.notify_ready`         | `() -> ()`              |
//! | import    | `env.log`                  | `(ptr, len) -> ()`      |
//! | export    | `memory`                   | linear memory           |
//! | export    | `alloc` / `dealloc`        | `(len) -> ptr` / `(ptr, len) -> ()` |
//! | export    | `_start` (optional)        | `() -> ()`              |
//! | export    | `validate_config`          | `(ptr, len) -> i64`     |
//! | export    | `get_version` (optional)   | `() -> i64`             |
//!
//! `i64` results are strings packed as `(ptr << 32) | len`; see [`engine`].
//!
//! ```ignore
//! use xray_editor_bootstrap::{BootstrapConfig, HttpFetcher, Orchestrator};
//! use xray_editor_wasm_host::{HostConfig, WasmHost};
//!
//! let host = WasmHost::new(HostConfig::default().with_fuel(50_000_000))?;
//! let mut orchestrator = Orchestrator::new(HttpFetcher::from_config(&config)?, host, &config);
//! let capabilities = orchestrator.run().await?;
//! ```

pub mod engine;
pub mod error;
pub mod host;

pub use engine::WasmEngine;
pub use error::{HostError, Result};
pub use host::{HostConfig, HostState, WasmHost};
