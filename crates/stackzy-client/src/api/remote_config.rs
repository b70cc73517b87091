//! Remote configuration endpoint.

use crate::StackzyClient;
use async_trait::async_trait;
use stackzy_core::{AnalyzerConfig, ConfigProvider, Result};

/// Remote configuration endpoint
pub struct ConfigApi<'a> {
    client: &'a StackzyClient,
}

impl<'a> ConfigApi<'a> {
    pub(crate) const fn new(client: &'a StackzyClient) -> Self {
        Self { client }
    }

    /// Fetch the analyzer version and caching policy
    pub async fn get(&self) -> Result<AnalyzerConfig> {
        self.client.get("/config", &[]).await?.into_data()
    }
}

#[async_trait]
impl ConfigProvider for StackzyClient {
    async fn analyzer_config(&self) -> Result<AnalyzerConfig> {
        self.config().get().await
    }
}
