//! Report assembly and post-processing.

use crate::analyzer::require_catalog;
use crate::resolver::AcquiredBinary;
use crate::state::StatePublisher;
use stackzy_core::{
    AnalysisReport, CachedResult, LibraryCatalog, PackageFingerprint, PersistenceStatus, Platform,
    Result, ResultCache,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Builds canonical reports and hands them off to the cache
pub struct ReportAssembler;

impl ReportAssembler {
    /// Rebuild a report from a cache hit
    ///
    /// Libraries are re-resolved against the local catalog; packages the
    /// catalog no longer knows are dropped. Untracked libraries are not
    /// cached, so the set is always empty.
    pub fn from_cache(cached: &CachedResult, catalog: Option<&LibraryCatalog>) -> Result<AnalysisReport> {
        let catalog = require_catalog(catalog)?;
        let libraries = catalog.resolve(cached.library_packages());

        let dropped = cached.library_packages().count().saturating_sub(libraries.len());
        if dropped > 0 {
            warn!(
                package = %cached.package_name,
                dropped,
                "cached libraries missing from the local catalog"
            );
        }

        let mut gradle_info = cached.gradle_info()?;
        if gradle_info.version_code.is_none() {
            gradle_info.version_code = Some(cached.version_code);
        }
        if gradle_info.version_name.is_none() {
            gradle_info.version_name.clone_from(&cached.version_name);
        }

        Ok(AnalysisReport {
            app_name: cached.app_name.clone(),
            package_name: cached.package_name.clone(),
            platform: Platform::from_class_name(&cached.platform)?,
            libraries,
            untracked_libraries: BTreeSet::new(),
            apk_size_in_mb: cached.apk_size_in_mb,
            assets_dir: None,
            permissions: cached.permission_list(),
            gradle_info,
        })
    }

    /// Move the binary next to its decompiled tree
    ///
    /// Failure is logged and the binary is discarded; the report stays valid.
    pub fn relocate_binary(
        report: &AnalysisReport,
        binary: AcquiredBinary,
        decompiled_dir: &Path,
    ) -> Option<PathBuf> {
        let destination = decompiled_dir.join(report.binary_file_name());
        match binary.persist(&destination) {
            Ok(path) => {
                info!(path = %path.display(), "binary kept with decompiled sources");
                Some(path)
            }
            Err((binary, error)) => {
                warn!(
                    from = %binary.path().display(),
                    to = %destination.display(),
                    error = %error,
                    "failed to relocate binary"
                );
                None
            }
        }
    }

    /// Store the report remotely without blocking its delivery
    ///
    /// The persistence status moves to `Pending` immediately and to
    /// `Stored` or `Failed` once the write completes. Failures are not
    /// retried.
    pub fn spawn_write_back(
        cache: Arc<dyn ResultCache>,
        report: &AnalysisReport,
        fingerprint: &PackageFingerprint,
        state: StatePublisher,
    ) -> Result<JoinHandle<()>> {
        let cached = CachedResult::from_report(report, fingerprint)?;
        let fingerprint = fingerprint.clone();
        let run = state.run_id();
        state.persistence_of(run, PersistenceStatus::Pending);

        Ok(tokio::spawn(async move {
            match cache.store(&cached).await {
                Ok(()) => {
                    info!(fingerprint = %fingerprint, "result stored");
                    state.persistence_of(run, PersistenceStatus::Stored);
                }
                Err(e) => {
                    warn!(fingerprint = %fingerprint, error = %e, "failed to store result");
                    state.persistence_of(run, PersistenceStatus::Failed(e.to_string()));
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackzy_core::{GradleInfo, Library};

    fn catalog() -> LibraryCatalog {
        LibraryCatalog::new([
            Library::new("OkHttp", "com.squareup.okhttp"),
            Library::new("Firebase", "com.google.firebase"),
        ])
    }

    fn cached() -> CachedResult {
        CachedResult {
            app_name: "Example".into(),
            package_name: "com.example.app".into(),
            version_code: 42,
            version_name: Some("1.0.3".into()),
            analyzer_version: "1.0".into(),
            platform: "com.theapache64.stackzy.data.local.Platform$NativeKotlin".into(),
            lib_packages: "com.squareup.okhttp, com.google.firebase,com.gone.library".into(),
            permissions: Some("android.permission.INTERNET,android.permission.CAMERA".into()),
            apk_size_in_mb: 12.5,
            gradle_info_json: r#"{"min_sdk":21}"#.into(),
            created_at: None,
        }
    }

    #[test]
    fn test_from_cache_re_resolves_libraries() {
        let report = ReportAssembler::from_cache(&cached(), Some(&catalog())).unwrap();
        assert_eq!(
            report.library_packages().collect::<Vec<_>>(),
            vec!["com.google.firebase", "com.squareup.okhttp"]
        );
        assert!(report.untracked_libraries.is_empty());
        assert_eq!(report.platform, Platform::NativeKotlin);
        assert_eq!(report.permissions, vec!["android.permission.INTERNET", "android.permission.CAMERA"]);
        assert_eq!(
            report.gradle_info,
            GradleInfo {
                version_name: Some("1.0.3".into()),
                version_code: Some(42),
                min_sdk: Some(21),
                target_sdk: None,
            }
        );
        assert!(report.assets_dir.is_none());
    }

    #[test]
    fn test_from_cache_requires_catalog() {
        let err = ReportAssembler::from_cache(&cached(), None).unwrap_err();
        assert_eq!(err.kind(), "catalog_unavailable");
    }

    #[test]
    fn test_from_cache_rejects_unknown_platform() {
        let mut entry = cached();
        entry.platform = "Fuchsia".into();
        let err = ReportAssembler::from_cache(&entry, Some(&catalog())).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }
}
