//! Schema-driven diagnostics setup.
//!
//! Independently of the engine, the editor can highlight structural errors
//! once the Xray JSON schema is registered with its JSON diagnostics. This
//! step is best-effort: it runs beside the bootstrap, and its failures are
//! logged and dropped without touching bootstrap or validation state.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::{FetchError, SchemaError};
use crate::fetch::HttpFetcher;

/// URI the schema is registered under.
pub const SCHEMA_URI: &str = "https://xray-config-schema.json";

/// Severity for problems the editor finds while resolving schema requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Ignore,
}

/// Associates a schema with the documents it applies to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaAssociation {
    pub file_match: Vec<String>,
    pub schema: serde_json::Value,
    pub uri: String,
}

/// JSON diagnostics options handed to the editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsOptions {
    pub allow_comments: bool,
    pub enable_schema_request: bool,
    pub schema_request: Severity,
    pub schemas: Vec<SchemaAssociation>,
    pub validate: bool,
}

impl DiagnosticsOptions {
    /// Options applying `schema` to every document.
    pub fn for_schema(schema: serde_json::Value) -> Self {
        Self {
            allow_comments: false,
            enable_schema_request: true,
            schema_request: Severity::Warning,
            schemas: vec![SchemaAssociation {
                file_match: vec!["*".to_string()],
                schema,
                uri: SCHEMA_URI.to_string(),
            }],
            validate: true,
        }
    }
}

/// Where schema documents come from.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn fetch_schema(&self, location: &str) -> Result<serde_json::Value, FetchError>;
}

#[async_trait]
impl SchemaSource for HttpFetcher {
    async fn fetch_schema(&self, location: &str) -> Result<serde_json::Value, FetchError> {
        self.fetch_json(location).await
    }
}

/// The editor's JSON diagnostics.
pub trait DiagnosticsRegistry: Send + Sync {
    fn set_diagnostics_options(&self, options: DiagnosticsOptions) -> Result<(), SchemaError>;
}

/// Fetch the schema and register it.
pub async fn setup_diagnostics<S, R>(
    source: &S,
    location: &str,
    registry: &R,
) -> Result<(), SchemaError>
where
    S: SchemaSource + ?Sized,
    R: DiagnosticsRegistry + ?Sized,
{
    let schema = source.fetch_schema(location).await?;
    registry.set_diagnostics_options(DiagnosticsOptions::for_schema(schema))?;
    tracing::info!(location, "JSON schema registered");
    Ok(())
}

/// Run [`setup_diagnostics`] as a detached task.
///
/// The task never fails: errors are logged and dropped.
pub fn spawn_diagnostics_setup<S, R>(
    source: Arc<S>,
    location: impl Into<String>,
    registry: Arc<R>,
) -> JoinHandle<()>
where
    S: SchemaSource + ?Sized + 'static,
    R: DiagnosticsRegistry + ?Sized + 'static,
{
    let location = location.into();
    tokio::spawn(async move {
        if let Err(e) = setup_diagnostics(&*source, &location, &*registry).await {
            tracing::error!(location = %location, error = %e, "failed to load JSON schema");
        }
    })
}
