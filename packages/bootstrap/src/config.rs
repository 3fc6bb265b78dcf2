//! Bootstrap configuration.
//!
//! Configuration is plain JSON with camelCase keys. Every field has a default,
//! so an empty object is a valid configuration:
//!
//! ```json
//! {
//!   "baseUrl": "https://editor.example.com/",
//!   "modulePath": "main.wasm",
//!   "schemaPath": "xray.schema.json",
//!   "readyTimeoutMs": null,
//!   "requestTimeoutMs": 120000
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Endpoints and timeouts for a bootstrap attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BootstrapConfig {
    /// Base URL that relative module and schema paths resolve against.
    pub base_url: String,

    /// Location of the engine's binary module.
    pub module_path: String,

    /// Location of the JSON schema used for editor diagnostics.
    pub schema_path: String,

    /// Upper bound on the readiness wait. `None` waits indefinitely.
    pub ready_timeout_ms: Option<u64>,

    /// Per-request timeout for the HTTP client.
    pub request_timeout_ms: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/".to_string(),
            module_path: "main.wasm".to_string(),
            schema_path: "xray.schema.json".to_string(),
            ready_timeout_ms: None,
            request_timeout_ms: 120_000,
        }
    }
}

impl BootstrapConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.base()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// The parsed base URL.
    pub fn base(&self) -> Result<Url, ConfigError> {
        Ok(Url::parse(&self.base_url)?)
    }

    pub fn module_url(&self) -> Result<Url, ConfigError> {
        Ok(self.base()?.join(&self.module_path)?)
    }

    pub fn schema_url(&self) -> Result<Url, ConfigError> {
        Ok(self.base()?.join(&self.schema_path)?)
    }

    pub fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
