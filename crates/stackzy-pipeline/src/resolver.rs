//! Turns an acquisition source into a local binary.

use crate::cancel::Cancellation;
use stackzy_core::{
    AcquisitionSource, DeviceBridge, DeviceHandle, DownloadProgress, ProgressSink, ProgressTracker,
    Result, StackzyError, StoreCredential, StoreDownloader,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tempfile::TempPath;
use tracing::{debug, info};

/// Store downloads can report completion before the file is flushed
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Resolver tuning
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Wait after a store download reaches 100%
    pub settle_delay: Duration,

    /// Directory for temporary binaries; the system temp dir if `None`
    pub temp_dir: Option<PathBuf>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            temp_dir: None,
        }
    }
}

impl ResolverOptions {
    #[must_use]
    pub const fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    #[must_use]
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}

/// Events emitted while a binary is being acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveEvent {
    /// Transfer progress; strictly increasing, ends with 100%
    Progress(DownloadProgress),
    /// Transfer done, waiting for the file to settle
    Settling(Duration),
}

/// A binary on local disk
///
/// The file is deleted on drop unless moved away with
/// [`persist`](Self::persist).
#[derive(Debug)]
pub struct AcquiredBinary {
    path: TempPath,
}

impl AcquiredBinary {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size on disk in bytes
    pub fn size(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Move the binary to `destination`, keeping it after drop
    ///
    /// On failure the binary is handed back untouched.
    pub fn persist(self, destination: &Path) -> std::result::Result<PathBuf, (Self, std::io::Error)> {
        match self.path.persist(destination) {
            Ok(()) => Ok(destination.to_path_buf()),
            Err(err) => Err((Self { path: err.path }, err.error)),
        }
    }
}

/// Filters raw reports into deduplicated, monotonic progress events
struct DedupSink<'a> {
    tracker: Mutex<ProgressTracker>,
    forward: &'a (dyn Fn(ResolveEvent) + Send + Sync),
}

impl<'a> DedupSink<'a> {
    fn new(forward: &'a (dyn Fn(ResolveEvent) + Send + Sync)) -> Self {
        Self {
            tracker: Mutex::new(ProgressTracker::new()),
            forward,
        }
    }

    fn emit(&self, step: impl FnOnce(&mut ProgressTracker) -> Option<DownloadProgress>) {
        let emitted = {
            let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
            step(&mut tracker)
        };
        if let Some(progress) = emitted {
            (self.forward)(ResolveEvent::Progress(progress));
        }
    }

    /// Guarantee the terminal 100% event
    fn complete(&self) {
        self.emit(ProgressTracker::complete);
    }
}

impl ProgressSink for DedupSink<'_> {
    fn report(&self, percent: u8) {
        self.emit(|tracker| tracker.advance(DownloadProgress::new(percent)));
    }
}

/// Acquires binaries from a device or the store
#[derive(Clone)]
pub struct SourceResolver {
    device: Arc<dyn DeviceBridge>,
    store: Arc<dyn StoreDownloader>,
    options: ResolverOptions,
}

impl SourceResolver {
    pub fn new(
        device: Arc<dyn DeviceBridge>,
        store: Arc<dyn StoreDownloader>,
        options: ResolverOptions,
    ) -> Self {
        Self {
            device,
            store,
            options,
        }
    }

    /// Fetch the binary of `package_name` from `source`
    ///
    /// The 100% event is always emitted before this returns successfully.
    /// Partial files are removed on failure or cancellation.
    pub async fn resolve(
        &self,
        source: &AcquisitionSource,
        package_name: &str,
        on_event: &(dyn Fn(ResolveEvent) + Send + Sync),
        cancel: &Cancellation,
    ) -> Result<AcquiredBinary> {
        let binary = self.fresh_binary(package_name)?;
        let sink = DedupSink::new(on_event);

        match source {
            AcquisitionSource::Device(device) => {
                self.pull_from_device(device, package_name, &binary, &sink, cancel)
                    .await?;
            }
            AcquisitionSource::Store(credential) => {
                self.download_from_store(credential, package_name, &binary, &sink, cancel)
                    .await?;
                on_event(ResolveEvent::Settling(self.options.settle_delay));
                cancel
                    .guard(async {
                        tokio::time::sleep(self.options.settle_delay).await;
                        Ok(())
                    })
                    .await?;
            }
        }

        let size = binary.size()?;
        if size == 0 {
            return Err(StackzyError::SourceUnavailable(format!(
                "{} returned an empty binary for {package_name}",
                source.label()
            )));
        }

        info!(package = package_name, source = source.label(), bytes = size, "binary acquired");
        Ok(binary)
    }

    async fn pull_from_device(
        &self,
        device: &DeviceHandle,
        package_name: &str,
        binary: &AcquiredBinary,
        sink: &DedupSink<'_>,
        cancel: &Cancellation,
    ) -> Result<()> {
        let remote = cancel
            .guard(self.device.apk_path(device, package_name))
            .await?
            .ok_or_else(|| {
                StackzyError::SourceUnavailable(format!("{package_name} is not installed on {device}"))
            })?;
        debug!(device = %device, remote = %remote, "resolved device path");

        cancel
            .guard(self.device.pull(device, &remote, binary.path(), sink))
            .await?;
        sink.complete();
        Ok(())
    }

    async fn download_from_store(
        &self,
        credential: &StoreCredential,
        package_name: &str,
        binary: &AcquiredBinary,
        sink: &DedupSink<'_>,
        cancel: &Cancellation,
    ) -> Result<()> {
        cancel
            .guard(self.store.download(credential, package_name, binary.path(), sink))
            .await?;
        sink.complete();
        Ok(())
    }

    fn fresh_binary(&self, package_name: &str) -> Result<AcquiredBinary> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(package_name).suffix(".apk");
        let file = match &self.options.temp_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempfile_in(dir)?
            }
            None => builder.tempfile()?,
        };
        Ok(AcquiredBinary {
            path: file.into_temp_path(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct ScriptedStore {
        reports: Vec<u8>,
        body: &'static [u8],
    }

    #[async_trait]
    impl StoreDownloader for ScriptedStore {
        async fn download(
            &self,
            _credential: &StoreCredential,
            _package_name: &str,
            destination: &Path,
            progress: &dyn ProgressSink,
        ) -> Result<()> {
            for percent in &self.reports {
                progress.report(*percent);
            }
            std::fs::write(destination, self.body)?;
            Ok(())
        }
    }

    struct ScriptedDevice {
        path: Option<&'static str>,
        fail_pull: bool,
    }

    #[async_trait]
    impl DeviceBridge for ScriptedDevice {
        async fn apk_path(&self, _device: &DeviceHandle, _package: &str) -> Result<Option<String>> {
            Ok(self.path.map(str::to_string))
        }

        async fn pull(
            &self,
            _device: &DeviceHandle,
            _remote: &str,
            destination: &Path,
            progress: &dyn ProgressSink,
        ) -> Result<()> {
            std::fs::write(destination, b"partial")?;
            progress.report(40);
            if self.fail_pull {
                return Err(StackzyError::transport("connection reset by device"));
            }
            progress.report(80);
            Ok(())
        }
    }

    fn resolver(store: ScriptedStore, device: ScriptedDevice) -> SourceResolver {
        SourceResolver::new(
            Arc::new(device),
            Arc::new(store),
            ResolverOptions::default().settle_delay(Duration::from_millis(1)),
        )
    }

    fn store_source() -> AcquisitionSource {
        AcquisitionSource::Store(StoreCredential::new("me@example.com", "token"))
    }

    fn collect() -> (Arc<Mutex<Vec<ResolveEvent>>>, impl Fn(ResolveEvent) + Send + Sync) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let events = Arc::clone(&events);
            move |event| events.lock().unwrap().push(event)
        };
        (events, sink)
    }

    fn percents(events: &[ResolveEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|e| match e {
                ResolveEvent::Progress(p) => Some(p.percent()),
                ResolveEvent::Settling(_) => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_store_progress_is_deduplicated() {
        let resolver = resolver(
            ScriptedStore {
                reports: vec![95, 100, 100],
                body: b"apk",
            },
            ScriptedDevice {
                path: None,
                fail_pull: false,
            },
        );
        let (events, sink) = collect();
        let binary = resolver
            .resolve(&store_source(), "com.example.app", &sink, &Cancellation::new())
            .await
            .unwrap();

        let events = events.lock().unwrap().clone();
        assert_eq!(percents(&events), vec![95, 100]);
        assert!(matches!(events.last(), Some(ResolveEvent::Settling(_))));
        assert!(binary.path().extension().is_some_and(|ext| ext == "apk"));
        assert_eq!(binary.size().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_progress_never_regresses_and_always_completes() {
        let resolver = resolver(
            ScriptedStore {
                reports: vec![0, 10, 10, 5, 30, 60],
                body: b"apk",
            },
            ScriptedDevice {
                path: None,
                fail_pull: false,
            },
        );
        let (events, sink) = collect();
        resolver
            .resolve(&store_source(), "com.example.app", &sink, &Cancellation::new())
            .await
            .unwrap();

        assert_eq!(percents(&events.lock().unwrap()), vec![0, 10, 30, 60, 100]);
    }

    #[tokio::test]
    async fn test_device_not_installed_is_source_unavailable() {
        let resolver = resolver(
            ScriptedStore {
                reports: vec![],
                body: b"",
            },
            ScriptedDevice {
                path: None,
                fail_pull: false,
            },
        );
        let source = AcquisitionSource::Device(DeviceHandle::new("emulator-5554"));
        let err = resolver
            .resolve(&source, "com.example.app", &|_| {}, &Cancellation::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StackzyError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_device_pull_completes_with_terminal_event() {
        let resolver = resolver(
            ScriptedStore {
                reports: vec![],
                body: b"",
            },
            ScriptedDevice {
                path: Some("/data/app/base.apk"),
                fail_pull: false,
            },
        );
        let (events, sink) = collect();
        let source = AcquisitionSource::Device(DeviceHandle::new("emulator-5554"));
        resolver
            .resolve(&source, "com.example.app", &sink, &Cancellation::new())
            .await
            .unwrap();
        // device pulls do not settle
        assert_eq!(*events.lock().unwrap(), vec![
            ResolveEvent::Progress(DownloadProgress::new(40)),
            ResolveEvent::Progress(DownloadProgress::new(80)),
            ResolveEvent::Progress(DownloadProgress::COMPLETE),
        ]);
    }

    #[tokio::test]
    async fn test_failed_pull_abandons_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = SourceResolver::new(
            Arc::new(ScriptedDevice {
                path: Some("/data/app/base.apk"),
                fail_pull: true,
            }),
            Arc::new(ScriptedStore {
                reports: vec![],
                body: b"",
            }),
            ResolverOptions::default().temp_dir(tmp.path()),
        );
        let source = AcquisitionSource::Device(DeviceHandle::new("emulator-5554"));
        let err = resolver
            .resolve(&source, "com.example.app", &|_| {}, &Cancellation::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "connection reset by device");
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_empty_download_is_rejected() {
        let resolver = resolver(
            ScriptedStore {
                reports: vec![100],
                body: b"",
            },
            ScriptedDevice {
                path: None,
                fail_pull: false,
            },
        );
        let err = resolver
            .resolve(&store_source(), "com.example.app", &|_| {}, &Cancellation::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StackzyError::SourceUnavailable(_)));
    }

    #[test]
    fn test_persist_moves_binary() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tempfile::NamedTempFile::new_in(tmp.path()).unwrap();
        std::fs::write(file.path(), b"apk").unwrap();
        let binary = AcquiredBinary {
            path: file.into_temp_path(),
        };

        let dest = tmp.path().join("kept.apk");
        let kept = binary.persist(&dest).unwrap();
        assert_eq!(std::fs::read(kept).unwrap(), b"apk");
    }
}
