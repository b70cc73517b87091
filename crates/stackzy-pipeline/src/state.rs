//! Single-writer, multi-reader publication of [`PipelineState`].

use stackzy_core::{AnalysisReport, DownloadProgress, PersistenceStatus, PipelineState, Stage};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Writer side of the pipeline state channel
///
/// Clones share the same channel so background tasks (the cache
/// write-back) can update the persistence status. Each [`begin`](Self::begin)
/// starts a new run id; updates tagged with an older id are dropped.
#[derive(Debug, Clone)]
pub struct StatePublisher {
    tx: Arc<watch::Sender<PipelineState>>,
    run: Arc<AtomicU64>,
}

impl StatePublisher {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PipelineState::default());
        Self {
            tx: Arc::new(tx),
            run: Arc::new(AtomicU64::new(0)),
        }
    }

    /// New reader, starting at the current state
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.tx.subscribe()
    }

    /// Copy of the current state
    #[must_use]
    pub fn snapshot(&self) -> PipelineState {
        self.tx.borrow().clone()
    }

    fn update(&self, f: impl FnOnce(&mut PipelineState)) {
        self.tx.send_modify(f);
    }

    /// Start a new run, dropping the outcome of the previous one
    pub fn begin(&self) {
        self.update(|state| {
            self.run.fetch_add(1, Ordering::SeqCst);
            *state = PipelineState {
                decompiled_dir: state.decompiled_dir.take(),
                ..PipelineState::default()
            };
        });
    }

    pub fn stage(&self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        debug!(?stage, message = %message, "pipeline stage");
        self.update(|state| {
            state.stage = stage;
            state.loading_message = Some(message);
        });
    }

    /// Replace the loading line without changing the stage
    pub fn message(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|state| state.loading_message = Some(message));
    }

    /// Return to `stage` after a side step, clearing the loading line
    pub fn restore(&self, stage: Stage) {
        self.update(|state| {
            state.stage = stage;
            state.loading_message = None;
        });
    }

    pub fn progress(&self, progress: DownloadProgress, message: impl Into<String>) {
        let message = message.into();
        self.update(|state| {
            state.progress = Some(progress);
            state.loading_message = Some(message);
        });
    }

    pub fn decompiled_dir(&self, dir: PathBuf) {
        self.update(|state| state.decompiled_dir = Some(dir));
    }

    /// Id of the current run
    #[must_use]
    pub fn run_id(&self) -> u64 {
        self.run.load(Ordering::SeqCst)
    }

    pub fn persistence(&self, status: PersistenceStatus) {
        self.update(|state| state.persistence = status);
    }

    /// Set the persistence status of run `run`; ignored once a newer run began
    pub fn persistence_of(&self, run: u64, status: PersistenceStatus) -> bool {
        self.tx.send_if_modified(|state| {
            if self.run.load(Ordering::SeqCst) != run {
                debug!(run, "dropping persistence update of a previous run");
                return false;
            }
            state.persistence = status;
            true
        })
    }

    /// Publish the finished report
    pub fn ready(&self, report: Arc<AnalysisReport>, persistence: PersistenceStatus) {
        self.update(|state| {
            state.stage = Stage::Ready;
            state.loading_message = None;
            state.fatal_error = None;
            state.report = Some(report);
            state.persistence = persistence;
        });
    }

    /// Publish a fatal error; no report is visible afterwards
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|state| {
            state.stage = Stage::Failed;
            state.loading_message = None;
            state.report = None;
            state.fatal_error = Some(message);
        });
    }
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_clears_report() {
        let state = StatePublisher::new();
        let rx = state.subscribe();
        state.stage(Stage::Decompiling, "Decompiling...");
        assert!(rx.borrow().is_loading());

        state.fail("decompile failed: boom");
        let seen = rx.borrow().clone();
        assert_eq!(seen.stage, Stage::Failed);
        assert!(seen.report.is_none());
        assert_eq!(seen.fatal_error.as_deref(), Some("decompile failed: boom"));
        assert!(seen.loading_message.is_none());
    }

    #[test]
    fn test_previous_run_cannot_overwrite_persistence() {
        let state = StatePublisher::new();
        state.begin();
        let first = state.run_id();
        state.persistence(PersistenceStatus::Pending);

        state.begin();
        assert_ne!(state.run_id(), first);
        assert!(!state.persistence_of(first, PersistenceStatus::Stored));
        assert_eq!(state.snapshot().persistence, PersistenceStatus::Skipped);

        assert!(state.persistence_of(state.run_id(), PersistenceStatus::Stored));
        assert_eq!(state.snapshot().persistence, PersistenceStatus::Stored);
    }

    #[test]
    fn test_begin_keeps_decompiled_dir() {
        let state = StatePublisher::new();
        state.decompiled_dir(PathBuf::from("/tmp/stackzy/com.example"));
        state.fail("x");
        state.begin();
        let seen = state.snapshot();
        assert_eq!(seen.stage, Stage::Idle);
        assert!(seen.fatal_error.is_none());
        assert_eq!(seen.decompiled_dir, Some(PathBuf::from("/tmp/stackzy/com.example")));
    }
}
