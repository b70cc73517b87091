//! Store download session.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client as HttpClient, StatusCode};
use stackzy_core::{
    DownloadProgress, ProgressSink, Result, StackzyError, StoreCredential, StoreDownloader,
};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Default connect timeout; the body itself may take minutes
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Downloads APKs from the store over HTTP
///
/// `GET {base}/apps/{package}/download` with the account token as bearer
/// credential; progress is derived from `Content-Length`.
#[derive(Clone)]
pub struct StoreClient {
    http: HttpClient,
    base_url: String,
}

impl StoreClient {
    /// Create a store client for the given endpoint
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_connect_timeout(base_url, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a store client with a custom connect timeout
    #[must_use]
    pub fn with_connect_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = HttpClient::builder()
            .connect_timeout(timeout)
            .user_agent(format!("stackzy-rust/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn download_url(&self, package_name: &str) -> Result<url::Url> {
        let mut url = url::Url::parse(self.base_url.trim_end_matches('/'))
            .map_err(|e| StackzyError::Config(format!("invalid store URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| StackzyError::Config("store URL cannot be a base".into()))?
            .extend(["apps", package_name, "download"]);
        Ok(url)
    }
}

#[async_trait]
impl StoreDownloader for StoreClient {
    async fn download(
        &self,
        credential: &StoreCredential,
        package_name: &str,
        destination: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let url = self.download_url(package_name)?;
        debug!(url = %url, account = %credential.email, "opening store download");

        let response = self
            .http
            .get(url)
            .bearer_auth(&credential.token)
            .send()
            .await
            .map_err(StackzyError::transport)?;

        let status = response.status();
        match status {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(StackzyError::SourceUnavailable(format!(
                    "{package_name} is not available in the store"
                )));
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(StackzyError::Transport(format!(
                    "store rejected the session of {}",
                    credential.email
                )));
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                return Err(StackzyError::Transport(format!(
                    "store download failed (HTTP {}): {}",
                    status.as_u16(),
                    body.trim()
                )));
            }
        }

        let total = response.content_length().unwrap_or(0);
        let mut file = tokio::fs::File::create(destination).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        progress.report(0);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(StackzyError::transport)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            if total > 0 {
                progress.report(DownloadProgress::from_bytes(written, total).percent());
            }
        }

        file.flush().await?;
        file.sync_all().await?;

        if total > 0 && written < total {
            return Err(StackzyError::Transport(format!(
                "store download ended early ({written} of {total} bytes)"
            )));
        }

        info!(package = package_name, bytes = written, "store download finished");
        progress.report(100);
        Ok(())
    }
}
