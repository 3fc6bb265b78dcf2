//! Error types for the Wasmtime host.

use std::string::FromUtf8Error;

use thiserror::Error;
use xray_editor_bootstrap::BootstrapError;

/// Errors raised while loading an engine module or calling into it.
#[derive(Debug, Error)]
pub enum HostError {
    /// The Wasmtime engine could not be configured.
    #[error("engine configuration failed: {0}")]
    Engine(String),

    /// The module bytes did not compile.
    #[error("module compilation failed: {0}")]
    Compile(String),

    /// Host functions could not be registered.
    #[error("linking host functions failed: {0}")]
    Link(String),

    /// The module could not be instantiated against the host imports.
    #[error("could not create instance: {0}")]
    Instantiate(String),

    /// `_start` trapped or has the wrong shape.
    #[error("entry point failed: {0}")]
    EntryPoint(String),

    /// Fuel could not be assigned to the store.
    #[error("fuel setup failed: {0}")]
    Fuel(String),

    /// The export was not found.
    #[error("export not found: {0}")]
    ExportNotFound(String),

    /// The export exists but its type differs from the ABI.
    #[error("export {export} has an unexpected signature: {message}")]
    Signature { export: String, message: String },

    /// The guest trapped during a call.
    #[error("guest trapped: {0}")]
    Trap(String),

    /// The guest handed back a range outside its memory.
    #[error("guest memory access out of bounds: {len} bytes at {ptr}")]
    OutOfBounds { ptr: u32, len: u32 },

    /// Input does not fit a 32-bit length.
    #[error("input too large: {0} bytes")]
    InputTooLarge(usize),

    /// The guest returned bytes that are not UTF-8.
    #[error("guest returned invalid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// Result type alias for host operations.
pub type Result<T> = std::result::Result<T, HostError>;

impl From<HostError> for BootstrapError {
    fn from(e: HostError) -> Self {
        BootstrapError::instantiation(e.to_string())
    }
}
