//! Library catalog endpoints.

use crate::StackzyClient;
use stackzy_core::{Library, LibraryCatalog, Result};

/// Library catalog endpoints
pub struct LibrariesApi<'a> {
    client: &'a StackzyClient,
}

impl<'a> LibrariesApi<'a> {
    pub(crate) const fn new(client: &'a StackzyClient) -> Self {
        Self { client }
    }

    /// List every known library
    pub async fn list(&self) -> Result<Vec<Library>> {
        self.client.get("/libraries", &[]).await?.into_data()
    }

    /// Fetch the list and index it as a catalog
    pub async fn catalog(&self) -> Result<LibraryCatalog> {
        Ok(LibraryCatalog::new(self.list().await?))
    }
}
