//! Seams to the external collaborators of a pipeline run.
//!
//! Implementations live in `stackzy-client` (HTTP) and `stackzy-pipeline`
//! (`adb`); tests substitute in-memory fakes.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::types::{AnalyzerConfig, CachedResult, DeviceHandle, PackageFingerprint, StoreCredential};

/// Outcome of a cache lookup that reached the remote side
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// A previous result exists for the fingerprint
    Found(CachedResult),
    /// Nobody analysed this fingerprint yet
    NotFound,
}

/// Remote store of previously computed reports
///
/// Transport failures are returned as
/// [`StackzyError::Transport`](crate::StackzyError::Transport).
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Look up the result stored under `fingerprint`
    async fn lookup(&self, fingerprint: &PackageFingerprint) -> Result<CacheLookup>;

    /// Store a freshly computed result
    async fn store(&self, result: &CachedResult) -> Result<()>;
}

/// Receives raw transfer percentages from a collaborator
///
/// Values may repeat or arrive out of order; the resolver filters them.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8);
}

impl<F> ProgressSink for F
where
    F: Fn(u8) + Send + Sync,
{
    fn report(&self, percent: u8) {
        self(percent);
    }
}

/// Store download session
#[async_trait]
pub trait StoreDownloader: Send + Sync {
    /// Download the current release of `package_name` into `destination`
    async fn download(
        &self,
        credential: &StoreCredential,
        package_name: &str,
        destination: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<()>;
}

/// Connected-device bridge
#[async_trait]
pub trait DeviceBridge: Send + Sync {
    /// Path of the installed APK on the device, `None` if not installed
    async fn apk_path(&self, device: &DeviceHandle, package_name: &str) -> Result<Option<String>>;

    /// Copy `remote_path` from the device into `destination`
    async fn pull(
        &self,
        device: &DeviceHandle,
        remote_path: &str,
        destination: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<()>;
}

/// Remote list of namespaces that are not in the catalog yet
#[async_trait]
pub trait UntrackedLibraryRegistry: Send + Sync {
    /// Namespaces already reported
    async fn known(&self) -> Result<Vec<String>>;

    /// Report one namespace
    async fn submit(&self, package_name: &str) -> Result<()>;
}

/// Supplies the analyzer version and caching policy
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn analyzer_config(&self) -> Result<AnalyzerConfig>;
}
