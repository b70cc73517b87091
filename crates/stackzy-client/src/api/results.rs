//! Result cache endpoints.

use crate::StackzyClient;
use async_trait::async_trait;
use stackzy_core::{CacheLookup, CachedResult, PackageFingerprint, Result, ResultCache};
use tracing::debug;

/// Message the server sends when no result exists for a fingerprint
pub const NO_DATA_FOUND: &str = "No data found";

/// Result cache endpoints
pub struct ResultsApi<'a> {
    client: &'a StackzyClient,
}

impl<'a> ResultsApi<'a> {
    pub(crate) const fn new(client: &'a StackzyClient) -> Self {
        Self { client }
    }

    /// Look up a previously computed result
    ///
    /// The "No data found" sentinel maps to [`CacheLookup::NotFound`]; every
    /// other failure is a transport error.
    pub async fn find(&self, fingerprint: &PackageFingerprint) -> Result<CacheLookup> {
        let version_code = fingerprint.version_code.to_string();
        let params = [
            ("package_name", fingerprint.package_name.as_str()),
            ("version_code", version_code.as_str()),
            ("analyzer_version", fingerprint.analyzer_version.as_str()),
        ];

        let envelope = self
            .client
            .get::<CachedResult>("/results", &params)
            .await?;

        if envelope.error && envelope.message.trim() == NO_DATA_FOUND {
            debug!(%fingerprint, "no cached result");
            return Ok(CacheLookup::NotFound);
        }

        envelope.into_data().map(CacheLookup::Found)
    }

    /// Store a freshly computed result
    pub async fn add(&self, result: &CachedResult) -> Result<()> {
        self.client
            .post::<serde_json::Value, _>("/results", result)
            .await?
            .into_ack()
    }
}

#[async_trait]
impl ResultCache for StackzyClient {
    async fn lookup(&self, fingerprint: &PackageFingerprint) -> Result<CacheLookup> {
        self.results().find(fingerprint).await
    }

    async fn store(&self, result: &CachedResult) -> Result<()> {
        self.results().add(result).await
    }
}
