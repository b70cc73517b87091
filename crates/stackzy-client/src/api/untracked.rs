//! Untracked library endpoints.

use crate::StackzyClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stackzy_core::{Result, UntrackedLibraryRegistry};

/// A namespace reported as missing from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntrackedLibrary {
    pub package_names: String,
}

/// Untracked library endpoints
pub struct UntrackedApi<'a> {
    client: &'a StackzyClient,
}

impl<'a> UntrackedApi<'a> {
    pub(crate) const fn new(client: &'a StackzyClient) -> Self {
        Self { client }
    }

    /// List namespaces already reported
    pub async fn list(&self) -> Result<Vec<UntrackedLibrary>> {
        self.client.get("/untracked_libraries", &[]).await?.into_data()
    }

    /// Report a namespace
    pub async fn add(&self, library: &UntrackedLibrary) -> Result<()> {
        self.client
            .post::<serde_json::Value, _>("/untracked_libraries", library)
            .await?
            .into_ack()
    }
}

#[async_trait]
impl UntrackedLibraryRegistry for StackzyClient {
    async fn known(&self) -> Result<Vec<String>> {
        let libraries = self.untracked().list().await?;
        Ok(libraries.into_iter().map(|l| l.package_names).collect())
    }

    async fn submit(&self, package_name: &str) -> Result<()> {
        let library = UntrackedLibrary {
            package_names: package_name.to_string(),
        };
        self.untracked().add(&library).await
    }
}
