use std::path::PathBuf;
use std::sync::Arc;

use super::progress::DownloadProgress;
use super::report::AnalysisReport;

/// Stage a pipeline run is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// Bound but not started
    #[default]
    Idle,
    /// Looking up a previous result
    CheckingCache,
    /// Pulling or downloading the binary
    Acquiring,
    /// Waiting for the binary to settle on disk
    Preparing,
    /// Running the decompiler
    Decompiling,
    /// Matching the decompiled tree against the catalog
    Analysing,
    /// Report delivered
    Ready,
    /// Run aborted; see [`PipelineState::fatal_error`]
    Failed,
}

impl Stage {
    /// Returns true once the run has finished, successfully or not
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// Outcome of the cache write-back
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PersistenceStatus {
    /// Nothing to write (cache hit, caching disabled or no version code)
    #[default]
    Skipped,
    /// Write in flight
    Pending,
    /// Stored remotely
    Stored,
    /// Write failed; the report is still valid
    Failed(String),
}

/// Observable state of a pipeline, published after every transition
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub stage: Stage,

    /// Human-readable progress line
    pub loading_message: Option<String>,

    /// Latest transfer progress of the current acquisition
    pub progress: Option<DownloadProgress>,

    /// Set when the run aborts; never set together with `report`
    pub fatal_error: Option<String>,

    pub report: Option<Arc<AnalysisReport>>,

    pub persistence: PersistenceStatus,

    /// Decompiled directory of the last fresh decompile
    pub decompiled_dir: Option<PathBuf>,
}

impl PipelineState {
    /// Returns true while a run is in progress
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        !matches!(self.stage, Stage::Idle) && !self.stage.is_terminal()
    }
}
