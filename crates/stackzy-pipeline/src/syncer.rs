//! Reporting of untracked namespaces to the remote registry.
//!
//! Off unless explicitly enabled.

use stackzy_core::{is_within_namespace, Result, UntrackedLibraryRegistry};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-item progress of a sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncProgress {
    /// Items attempted so far, including `current`
    pub done: usize,
    pub total: usize,
    pub current: String,
}

impl SyncProgress {
    /// Fraction synced, in `0.0..=1.0`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.done as f32 / self.total as f32
        }
    }
}

/// What a sync submitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub submitted: Vec<String>,

    /// `(namespace, error)` pairs
    pub failed: Vec<(String, String)>,

    /// Namespaces skipped because the registry already knew them
    pub already_known: usize,
}

/// Outcome of [`UntrackedLibrarySyncer::sync`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The syncer is not enabled; nothing was contacted
    Disabled,
    Synced(SyncSummary),
}

/// Namespaces still to submit, in sorted order
///
/// Drops what the registry knows and anything inside the app's own package.
#[must_use]
pub fn pending_untracked<'a>(
    app_package: &str,
    untracked: &'a BTreeSet<String>,
    known: &[String],
) -> Vec<&'a str> {
    let known: HashSet<&str> = known.iter().map(|k| k.trim()).collect();
    untracked
        .iter()
        .map(String::as_str)
        .filter(|ns| !known.contains(ns))
        .filter(|ns| !is_within_namespace(ns, app_package))
        .collect()
}

/// Submits untracked namespaces one at a time
#[derive(Clone)]
pub struct UntrackedLibrarySyncer {
    registry: Arc<dyn UntrackedLibraryRegistry>,
    enabled: bool,
}

impl UntrackedLibrarySyncer {
    /// Create a disabled syncer
    pub fn new(registry: Arc<dyn UntrackedLibraryRegistry>) -> Self {
        Self {
            registry,
            enabled: false,
        }
    }

    /// Turn the syncer on or off
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Submit every pending namespace
    ///
    /// Fetching the known list is the only fatal step; each submission is
    /// independent and a failed one does not stop the rest.
    pub async fn sync(
        &self,
        app_package: &str,
        untracked: &BTreeSet<String>,
        on_progress: impl Fn(SyncProgress) + Send + Sync,
    ) -> Result<SyncOutcome> {
        if !self.enabled {
            debug!(package = app_package, "untracked library sync disabled");
            return Ok(SyncOutcome::Disabled);
        }

        let known = self.registry.known().await?;
        let pending = pending_untracked(app_package, untracked, &known);
        let mut summary = SyncSummary {
            already_known: untracked
                .iter()
                .filter(|ns| known.iter().any(|k| k.trim() == ns.as_str()))
                .count(),
            ..SyncSummary::default()
        };

        let total = pending.len();
        for (index, namespace) in pending.into_iter().enumerate() {
            on_progress(SyncProgress {
                done: index + 1,
                total,
                current: namespace.to_string(),
            });
            match self.registry.submit(namespace).await {
                Ok(()) => summary.submitted.push(namespace.to_string()),
                Err(e) => {
                    warn!(namespace, error = %e, "failed to submit untracked library");
                    summary.failed.push((namespace.to_string(), e.to_string()));
                }
            }
        }

        info!(
            package = app_package,
            submitted = summary.submitted.len(),
            failed = summary.failed.len(),
            "untracked libraries synced"
        );
        Ok(SyncOutcome::Synced(summary))
    }
}
