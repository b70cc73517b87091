use serde::{Deserialize, Serialize};

/// Percentage of a binary transfer, in `0..=100`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DownloadProgress(u8);

impl DownloadProgress {
    /// The binary is fully materialized
    pub const COMPLETE: Self = Self(100);

    /// Create from a percentage, clamped to 100
    #[must_use]
    pub fn new(percent: u8) -> Self {
        Self(percent.min(100))
    }

    /// Compute from transferred and total byte counts
    #[must_use]
    pub fn from_bytes(done: u64, total: u64) -> Self {
        if total == 0 {
            return Self(0);
        }
        let percent = done.saturating_mul(100) / total;
        Self(u8::try_from(percent.min(100)).unwrap_or(100))
    }

    #[must_use]
    pub const fn percent(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.0 >= 100
    }
}

impl std::fmt::Display for DownloadProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Filters raw progress reports into a strictly increasing sequence
///
/// Repeated or regressing values are dropped, so consumers never see two
/// equal consecutive events.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    last: Option<DownloadProgress>,
}

impl ProgressTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Returns the progress to emit, or `None` if nothing changed
    pub fn advance(&mut self, progress: DownloadProgress) -> Option<DownloadProgress> {
        if self.last.is_some_and(|last| progress <= last) {
            return None;
        }
        self.last = Some(progress);
        Some(progress)
    }

    /// Emit the terminal 100% event if it was not seen yet
    pub fn complete(&mut self) -> Option<DownloadProgress> {
        self.advance(DownloadProgress::COMPLETE)
    }

    #[must_use]
    pub const fn last(&self) -> Option<DownloadProgress> {
        self.last
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.last.is_some_and(DownloadProgress::is_complete)
    }
}
