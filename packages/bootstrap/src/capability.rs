//! The engine's capability surface.
//!
//! A running engine exposes two functions once ready: validate-config and
//! get-version. The orchestrator never assumes they exist; it probes the
//! [`EngineInstance`] after the readiness signal and only then builds a
//! [`Capabilities`] handle. Holding a `Capabilities` is therefore proof that
//! validate-config was present and callable.

use std::fmt;
use std::sync::Arc;

use crate::error::{BootstrapError, EngineError, Result};

/// A function the engine may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ValidateConfig,
    GetVersion,
}

impl Capability {
    /// Name of the module export implementing this capability.
    pub const fn export_name(&self) -> &'static str {
        match self {
            Capability::ValidateConfig => "validate_config",
            Capability::GetVersion => "get_version",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::ValidateConfig => write!(f, "validate-config"),
            Capability::GetVersion => write!(f, "get-version"),
        }
    }
}

/// Result of probing an engine for a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityStatus {
    Callable,
    Missing,
    /// Present, but with a shape the host cannot call.
    NotCallable,
}

impl fmt::Display for CapabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityStatus::Callable => write!(f, "callable"),
            CapabilityStatus::Missing => write!(f, "missing"),
            CapabilityStatus::NotCallable => write!(f, "not callable"),
        }
    }
}

/// A live engine instance.
///
/// Implemented by runtime hosts. Calls are synchronous; implementations
/// serialize access to their underlying instance.
pub trait EngineInstance: Send + Sync {
    /// Check whether a capability is present and callable.
    fn probe(&self, capability: Capability) -> CapabilityStatus;

    /// Validate configuration text. An empty string means valid.
    fn validate_config(&self, config: &str) -> std::result::Result<String, EngineError>;

    /// Report the engine version.
    fn get_version(&self) -> std::result::Result<String, EngineError>;
}

/// Confirmed capability surface of a ready engine.
#[derive(Clone)]
pub struct Capabilities {
    engine: Arc<dyn EngineInstance>,
    version: String,
}

impl Capabilities {
    /// Verify the surface of a ready engine.
    ///
    /// Fails with [`BootstrapError::CapabilityMissing`] unless validate-config
    /// is callable. get-version is optional: when callable it is called once
    /// and cached, and any failure leaves the version empty.
    pub fn confirm(engine: Arc<dyn EngineInstance>) -> Result<Self> {
        match engine.probe(Capability::ValidateConfig) {
            CapabilityStatus::Callable => {}
            reason => {
                return Err(BootstrapError::CapabilityMissing {
                    capability: Capability::ValidateConfig,
                    reason,
                })
            }
        }

        let version = match engine.probe(Capability::GetVersion) {
            CapabilityStatus::Callable => engine.get_version().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "engine version unavailable");
                String::new()
            }),
            status => {
                tracing::debug!(%status, "engine does not report a version");
                String::new()
            }
        };

        Ok(Self { engine, version })
    }

    /// Engine version, empty if the engine did not report one.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn validate_config(&self, config: &str) -> std::result::Result<String, EngineError> {
        self.engine.validate_config(config)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Scriptable engine for tests.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// An engine whose capabilities and answers are configured up front.
    #[derive(Default)]
    pub struct MockEngine {
        statuses: HashMap<Capability, CapabilityStatus>,
        version: Option<String>,
        errors: HashMap<String, String>,
        fail_with: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl MockEngine {
        /// An engine with both capabilities callable.
        pub fn new(version: impl Into<String>) -> Self {
            Self::default()
                .with_status(Capability::ValidateConfig, CapabilityStatus::Callable)
                .with_status(Capability::GetVersion, CapabilityStatus::Callable)
                .with_version(version)
        }

        pub fn with_status(mut self, capability: Capability, status: CapabilityStatus) -> Self {
            self.statuses.insert(capability, status);
            self
        }

        pub fn with_version(mut self, version: impl Into<String>) -> Self {
            self.version = Some(version.into());
            self
        }

        /// Report `error` when validating exactly `config`.
        pub fn with_error(mut self, config: impl Into<String>, error: impl Into<String>) -> Self {
            self.errors.insert(config.into(), error.into());
            self
        }

        /// Make every call trap with `message`.
        pub fn fail_with(mut self, message: impl Into<String>) -> Self {
            self.fail_with = Some(message.into());
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl EngineInstance for MockEngine {
        fn probe(&self, capability: Capability) -> CapabilityStatus {
            self.statuses
                .get(&capability)
                .copied()
                .unwrap_or(CapabilityStatus::Missing)
        }

        fn validate_config(&self, config: &str) -> std::result::Result<String, EngineError> {
            self.calls.lock().unwrap().push(config.to_string());
            if let Some(message) = &self.fail_with {
                return Err(EngineError::call(Capability::ValidateConfig, message.clone()));
            }
            Ok(self.errors.get(config).cloned().unwrap_or_default())
        }

        fn get_version(&self) -> std::result::Result<String, EngineError> {
            if let Some(message) = &self.fail_with {
                return Err(EngineError::call(Capability::GetVersion, message.clone()));
            }
            Ok(self.version.clone().unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockEngine;
    use super::*;

    #[test]
    fn confirm_caches_version() {
        let caps = Capabilities::confirm(Arc::new(MockEngine::new("1.8.0"))).unwrap();
        assert_eq!(caps.version(), "1.8.0");
    }

    #[test]
    fn confirm_requires_validate_config() {
        let engine = MockEngine::new("1.8.0")
            .with_status(Capability::ValidateConfig, CapabilityStatus::Missing);
        let err = Capabilities::confirm(Arc::new(engine)).unwrap_err();
        assert!(err.is_validator_missing());
    }

    #[test]
    fn confirm_rejects_uncallable_validate_config() {
        let engine = MockEngine::new("1.8.0")
            .with_status(Capability::ValidateConfig, CapabilityStatus::NotCallable);
        let err = Capabilities::confirm(Arc::new(engine)).unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::CapabilityMissing {
                capability: Capability::ValidateConfig,
                reason: CapabilityStatus::NotCallable,
            }
        ));
    }

    #[test]
    fn missing_version_leaves_it_empty() {
        let engine = MockEngine::new("1.8.0")
            .with_status(Capability::GetVersion, CapabilityStatus::Missing);
        let caps = Capabilities::confirm(Arc::new(engine)).unwrap();
        assert_eq!(caps.version(), "");
    }

    #[test]
    fn failing_version_call_is_swallowed() {
        let engine = MockEngine::new("1.8.0").fail_with("unreachable");
        let caps = Capabilities::confirm(Arc::new(engine)).unwrap();
        assert_eq!(caps.version(), "");
    }

    #[test]
    fn export_names() {
        assert_eq!(Capability::ValidateConfig.export_name(), "validate_config");
        assert_eq!(Capability::GetVersion.export_name(), "get_version");
    }
}
