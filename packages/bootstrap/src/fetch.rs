//! Binary fetcher with progress reporting.
//!
//! The fetcher downloads the engine's binary module and reports a fraction in
//! `[0, 1]` as bytes arrive. Reported values never decrease, and `1.0` is
//! reported exactly once, as the final value, when the body is complete.
//!
//! When the server does not send a content length the fetcher reports `0.0`
//! and holds there until completion.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::config::BootstrapConfig;
use crate::error::FetchError;

/// Largest buffer reserved up front from a response's Content-Length.
const MAX_RESERVE_BYTES: u64 = 16 << 20;

/// Raw bytes of a compiled engine module.
///
/// The content is opaque to the fetcher; it is moved into the runtime host
/// and dropped once compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleBinary(Vec<u8>);

impl ModuleBinary {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for ModuleBinary {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Progress callback, invoked with the fraction of the body received.
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Retrieves an engine module.
///
/// Implementations must uphold the progress contract described in the
/// module docs and must not surface partial bodies on failure.
#[async_trait]
pub trait ModuleFetcher: Send + Sync {
    /// Fetch the module at `location`, reporting progress along the way.
    async fn fetch(
        &self,
        location: &str,
        on_progress: ProgressFn<'_>,
    ) -> Result<ModuleBinary, FetchError>;
}

/// Turns byte counts into a monotonic progress sequence.
pub struct ProgressTracker<'a> {
    total: Option<u64>,
    received: u64,
    last: f64,
    sink: ProgressFn<'a>,
}

impl<'a> ProgressTracker<'a> {
    /// Start tracking a body of `total` bytes. Reports the initial `0.0`.
    pub fn start(total: Option<u64>, sink: ProgressFn<'a>) -> Self {
        sink(0.0);
        Self {
            total: total.filter(|t| *t > 0),
            received: 0,
            last: 0.0,
            sink,
        }
    }

    /// Record `n` more bytes.
    pub fn advance(&mut self, n: usize) {
        self.received += n as u64;
        let Some(total) = self.total else {
            return;
        };

        // 1.0 is reserved for `finish`.
        let fraction = (self.received as f64 / total as f64).min(1.0);
        if fraction > self.last && fraction < 1.0 {
            self.last = fraction;
            (self.sink)(fraction);
        }
    }

    /// Report completion.
    pub fn finish(self) {
        (self.sink)(1.0);
    }

    pub fn received(&self) -> u64 {
        self.received
    }
}

/// Production fetcher over `reqwest`.
///
/// Relative locations resolve against the base URL; absolute `http(s)`
/// locations are used as given.
pub struct HttpFetcher {
    client: Client,
    base_url: Url,
}

impl HttpFetcher {
    /// Create a fetcher with the given request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Create with a default timeout of 30 seconds.
    pub fn with_default_timeout(base_url: &str) -> Result<Self, FetchError> {
        Self::new(base_url, Duration::from_secs(30))
    }

    pub fn from_config(config: &BootstrapConfig) -> Result<Self, FetchError> {
        Self::new(&config.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a location against the base URL.
    pub fn resolve(&self, location: &str) -> Result<Url, FetchError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            Ok(Url::parse(location)?)
        } else {
            Ok(self.base_url.join(location)?)
        }
    }

    async fn get(&self, location: &str) -> Result<reqwest::Response, FetchError> {
        let url = self.resolve(location)?;
        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }

    /// Fetch a JSON document.
    pub async fn fetch_json(&self, location: &str) -> Result<serde_json::Value, FetchError> {
        let response = self.get(location).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ModuleFetcher for HttpFetcher {
    async fn fetch(
        &self,
        location: &str,
        on_progress: ProgressFn<'_>,
    ) -> Result<ModuleBinary, FetchError> {
        let mut response = self.get(location).await?;

        let total = response.content_length();
        // Content-Length is only a hint; the buffer grows with the body.
        let reserve = total.unwrap_or(0).min(MAX_RESERVE_BYTES) as usize;
        let mut bytes = Vec::with_capacity(reserve);
        let mut tracker = ProgressTracker::start(total, on_progress);

        while let Some(chunk) = response.chunk().await? {
            bytes.extend_from_slice(&chunk);
            tracker.advance(chunk.len());
        }

        tracing::debug!(location, bytes = tracker.received(), "module fetched");
        tracker.finish();
        Ok(ModuleBinary::new(bytes))
    }
}
