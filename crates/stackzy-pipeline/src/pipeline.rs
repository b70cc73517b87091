//! The analysis pipeline: cache → acquire → decompile → analyse → report.

use crate::analyzer::{require_catalog, AnalyzerOptions, LibraryAnalyzer};
use crate::assembler::ReportAssembler;
use crate::cancel::Cancellation;
use crate::decompiler::Decompiler;
use crate::lock::lock_package;
use crate::paths::{self, is_populated};
use crate::resolver::{AcquiredBinary, ResolveEvent, ResolverOptions, SourceResolver};
use crate::state::StatePublisher;
use crate::syncer::{SyncOutcome, UntrackedLibrarySyncer};
use stackzy_core::{
    AcquisitionSource, AnalysisReport, AnalyzerConfig, AppTarget, CacheLookup, DeviceBridge,
    LibraryCatalog, PackageFingerprint, PersistenceStatus, PipelineState, Result, ResultCache,
    Stage, StackzyError, StoreDownloader,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Pipeline tuning
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Root under which `stackzy/<package>` directories are created
    pub temp_root: PathBuf,
    pub resolver: ResolverOptions,
    pub analyzer: AnalyzerOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            temp_root: paths::default_temp_root(),
            resolver: ResolverOptions::default(),
            analyzer: AnalyzerOptions::default(),
        }
    }
}

impl PipelineOptions {
    #[must_use]
    pub fn temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = root.into();
        self
    }

    #[must_use]
    pub fn resolver(mut self, options: ResolverOptions) -> Self {
        self.resolver = options;
        self
    }

    #[must_use]
    pub fn analyzer(mut self, options: AnalyzerOptions) -> Self {
        self.analyzer = options;
        self
    }
}

/// External services a pipeline talks to
#[derive(Clone)]
pub struct Collaborators {
    pub cache: Arc<dyn ResultCache>,
    pub device: Arc<dyn DeviceBridge>,
    pub store: Arc<dyn StoreDownloader>,
    pub decompiler: Arc<dyn Decompiler>,

    /// Loaded library catalog; runs fail with `CatalogUnavailable` without one
    pub catalog: Option<Arc<LibraryCatalog>>,

    /// Untracked library reporting, if configured
    pub syncer: Option<UntrackedLibrarySyncer>,
}

/// Result of the fallible part of a run
struct Outcome {
    report: AnalysisReport,

    /// Set when a fresh report must be written back
    write_back: Option<PackageFingerprint>,
}

/// Analysis of one application from one acquisition source
///
/// The target and source are bound at construction. Runs take `&mut self`,
/// so a pipeline is only ever driven sequentially; runs for the same
/// package from other pipelines are serialized by a process-wide lock.
pub struct AnalysisPipeline {
    target: AppTarget,
    source: AcquisitionSource,
    config: AnalyzerConfig,
    cache: Arc<dyn ResultCache>,
    decompiler: Arc<dyn Decompiler>,
    catalog: Option<Arc<LibraryCatalog>>,
    syncer: Option<UntrackedLibrarySyncer>,
    resolver: SourceResolver,
    analyzer: LibraryAnalyzer,
    temp_root: PathBuf,
    state: StatePublisher,
    background: Vec<JoinHandle<()>>,
}

impl AnalysisPipeline {
    /// Bind a pipeline to `target` and `source`
    pub fn new(
        target: AppTarget,
        source: AcquisitionSource,
        config: AnalyzerConfig,
        deps: Collaborators,
        options: PipelineOptions,
    ) -> Self {
        Self {
            target,
            source,
            config,
            cache: deps.cache,
            decompiler: deps.decompiler,
            catalog: deps.catalog,
            syncer: deps.syncer,
            resolver: SourceResolver::new(deps.device, deps.store, options.resolver),
            analyzer: LibraryAnalyzer::new(options.analyzer),
            temp_root: options.temp_root,
            state: StatePublisher::new(),
            background: Vec::new(),
        }
    }

    #[must_use]
    pub const fn target(&self) -> &AppTarget {
        &self.target
    }

    #[must_use]
    pub const fn source(&self) -> &AcquisitionSource {
        &self.source
    }

    /// Observe state transitions
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state.snapshot()
    }

    /// Where the decompiled tree of the target lives
    #[must_use]
    pub fn decompiled_dir(&self) -> PathBuf {
        paths::decompiled_dir(&self.temp_root, self.target.package_name())
    }

    /// Run the pipeline to a report or a fatal error
    ///
    /// The report is published only once fully assembled. A fatal error
    /// clears any report from the state. The cache write-back and the
    /// untracked library sync continue in the background; see
    /// [`wait_for_background`](Self::wait_for_background).
    pub async fn run(&mut self, cancel: &Cancellation) -> Result<Arc<AnalysisReport>> {
        self.state.begin();
        info!(
            package = self.target.package_name(),
            source = self.source.label(),
            "analysis started"
        );

        match self.execute(cancel).await {
            Ok(outcome) => {
                let report = Arc::new(outcome.report);
                self.deliver(&report, outcome.write_back);
                Ok(report)
            }
            Err(e) => {
                error!(package = self.target.package_name(), error = %e, "analysis failed");
                self.state.fail(e.to_string());
                Err(e)
            }
        }
    }

    /// Directory with the decompiled sources of the target
    ///
    /// Decompiles again when the directory is gone, without analysing or
    /// writing to the cache. The current report and stage are kept.
    pub async fn source_directory(&mut self, cancel: &Cancellation) -> Result<PathBuf> {
        let dir = self.decompiled_dir();

        // another run may still be writing the tree
        let _guard = lock_package(self.target.package_name()).await;
        let previous = self.state.snapshot().stage;
        if is_populated(&dir) {
            return Ok(dir);
        }

        info!(package = self.target.package_name(), "decompiling again to show sources");
        let result = self.acquire_and_decompile(cancel).await;
        self.state.restore(previous);

        let (_binary, dir) = result?;
        self.state.decompiled_dir(dir.clone());
        Ok(dir)
    }

    /// Wait for write-backs and syncs spawned by previous runs
    pub async fn wait_for_background(&mut self) {
        for handle in self.background.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task panicked");
            }
        }
    }

    fn fingerprint(&self) -> Option<PackageFingerprint> {
        if !self.config.caching_enabled {
            return None;
        }
        self.target.fingerprint(&self.config.analyzer_version)
    }

    async fn execute(&self, cancel: &Cancellation) -> Result<Outcome> {
        let fingerprint = self.fingerprint();

        match &fingerprint {
            Some(fp) => {
                self.state.stage(Stage::CheckingCache, "Analysing previous results...");
                match cancel.guard(self.cache.lookup(fp)).await? {
                    CacheLookup::Found(cached) => {
                        info!(fingerprint = %fp, "cache hit");
                        let report = ReportAssembler::from_cache(&cached, self.catalog.as_deref())?;
                        return Ok(Outcome {
                            report,
                            write_back: None,
                        });
                    }
                    CacheLookup::NotFound => {
                        info!(fingerprint = %fp, "no previous result, decompiling from scratch");
                    }
                }
            }
            None if !self.config.caching_enabled => debug!("result cache disabled"),
            None => debug!("version code unknown, skipping result cache"),
        }

        let report = self.analyze_fresh(fingerprint.is_some(), cancel).await?;
        Ok(Outcome {
            report,
            write_back: fingerprint,
        })
    }

    async fn analyze_fresh(&self, persist: bool, cancel: &Cancellation) -> Result<AnalysisReport> {
        // no point downloading anything we cannot classify
        require_catalog(self.catalog.as_deref())?;

        let _guard = lock_package(self.target.package_name()).await;
        let (binary, dir) = self.acquire_and_decompile(cancel).await?;

        self.state.stage(Stage::Analysing, "Analysing...");
        let report = self.analyze_blocking(&binary, &dir).await?;

        self.state.message("Hold on please...");
        if persist {
            ReportAssembler::relocate_binary(&report, binary, &dir);
        }
        self.state.decompiled_dir(dir);
        Ok(report)
    }

    async fn acquire_and_decompile(&self, cancel: &Cancellation) -> Result<(AcquiredBinary, PathBuf)> {
        let package_name = self.target.package_name();
        let state = &self.state;
        let source = &self.source;

        state.stage(Stage::Acquiring, "Fetching APK...");
        let on_event = |event: ResolveEvent| match event {
            ResolveEvent::Progress(progress) => {
                let message = match source {
                    AcquisitionSource::Device(_) => format!("Pulling APK {progress} ..."),
                    AcquisitionSource::Store(_) => format!("Downloading APK... {progress}"),
                };
                state.progress(progress, message);
            }
            ResolveEvent::Settling(_) => {
                state.stage(Stage::Preparing, "Preparing APK for decompiling...");
            }
        };
        let binary = self
            .resolver
            .resolve(source, package_name, &on_event, cancel)
            .await?;

        state.stage(Stage::Decompiling, "Decompiling...");
        let on_line = |line: &str| state.message(format!("Decompiling... ({line})"));
        let dir = self
            .decompiler
            .decompile(binary.path(), &self.decompiled_dir(), &on_line, cancel)
            .await?;

        if !is_populated(&dir) {
            return Err(StackzyError::DecompileFailure(format!(
                "{} is missing or empty",
                dir.display()
            )));
        }
        Ok((binary, dir))
    }

    async fn analyze_blocking(&self, binary: &AcquiredBinary, dir: &Path) -> Result<AnalysisReport> {
        let analyzer = self.analyzer.clone();
        let catalog = self.catalog.clone();
        let package_name = self.target.package_name().to_string();
        let binary = binary.path().to_path_buf();
        let dir = dir.to_path_buf();

        tokio::task::spawn_blocking(move || {
            analyzer.analyze(&package_name, &binary, &dir, catalog.as_deref())
        })
        .await
        .map_err(|e| StackzyError::Io(std::io::Error::other(e)))?
    }

    /// Publish the report, then start the background work
    fn deliver(&mut self, report: &Arc<AnalysisReport>, write_back: Option<PackageFingerprint>) {
        let Some(fingerprint) = write_back else {
            self.state.ready(Arc::clone(report), PersistenceStatus::Skipped);
            self.spawn_sync(report);
            return;
        };

        self.state.ready(Arc::clone(report), PersistenceStatus::Pending);
        match ReportAssembler::spawn_write_back(
            Arc::clone(&self.cache),
            report,
            &fingerprint,
            self.state.clone(),
        ) {
            Ok(handle) => self.background.push(handle),
            Err(e) => {
                warn!(fingerprint = %fingerprint, error = %e, "could not prepare result for the cache");
                self.state.persistence(PersistenceStatus::Failed(e.to_string()));
            }
        }
        self.spawn_sync(report);
    }

    fn spawn_sync(&mut self, report: &AnalysisReport) {
        let Some(syncer) = self.syncer.clone().filter(UntrackedLibrarySyncer::is_enabled) else {
            return;
        };
        if report.untracked_libraries.is_empty() {
            return;
        }

        let package_name = report.package_name.clone();
        let untracked = report.untracked_libraries.clone();
        self.background.push(tokio::spawn(async move {
            let on_progress = |p: crate::syncer::SyncProgress| {
                debug!(namespace = %p.current, done = p.done, total = p.total, "syncing untracked library");
            };
            match syncer.sync(&package_name, &untracked, on_progress).await {
                Ok(SyncOutcome::Synced(summary)) if !summary.failed.is_empty() => {
                    warn!(failed = summary.failed.len(), "some untracked libraries were not synced");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "untracked library sync failed"),
            }
        }));
    }
}
