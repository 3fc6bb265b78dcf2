//! Error types for the bootstrap lifecycle and validation bridge.

use std::time::Duration;

use thiserror::Error;

use crate::capability::{Capability, CapabilityStatus};

/// Errors retrieving a module binary or a schema document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("unexpected status {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while calling into a running engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine trapped or violated the calling convention.
    #[error("{capability} failed: {message}")]
    Call {
        capability: Capability,
        message: String,
    },

    /// The editor could not produce its current text.
    #[error("editor unavailable: {message}")]
    Editor { message: String },
}

impl EngineError {
    pub fn call(capability: Capability, message: impl Into<String>) -> Self {
        EngineError::Call {
            capability,
            message: message.into(),
        }
    }
}

/// Errors that terminate a bootstrap attempt.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The module binary could not be retrieved.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The module bytes failed to load or start.
    #[error("instantiation failed: {message}")]
    Instantiation { message: String },

    /// The engine reported ready without a required capability.
    #[error("capability {capability} is {reason}")]
    CapabilityMissing {
        capability: Capability,
        reason: CapabilityStatus,
    },

    /// The engine did not signal readiness within the configured bound.
    #[error("engine did not signal readiness within {0:?}")]
    ReadyTimeout(Duration),

    /// The readiness hook was detached before the engine signalled.
    #[error("readiness hook detached before the engine signalled")]
    SignalDetached,

    /// `run` was called on an orchestrator that already ran.
    #[error("bootstrap already attempted")]
    AlreadyStarted,
}

impl BootstrapError {
    pub fn instantiation(message: impl Into<String>) -> Self {
        BootstrapError::Instantiation {
            message: message.into(),
        }
    }

    /// True when the failure is a missing validate-config capability.
    pub fn is_validator_missing(&self) -> bool {
        matches!(
            self,
            BootstrapError::CapabilityMissing {
                capability: Capability::ValidateConfig,
                ..
            }
        )
    }
}

/// Errors from the best-effort schema diagnostics setup.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("schema registration failed: {message}")]
    Registration { message: String },
}

/// Errors loading a [`BootstrapConfig`](crate::config::BootstrapConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for bootstrap operations.
pub type Result<T> = std::result::Result<T, BootstrapError>;
