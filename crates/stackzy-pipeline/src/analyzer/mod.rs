//! Library analysis of a decompiled tree.
//!
//! Every namespace that directly contains classes is matched against the
//! [`LibraryCatalog`] by dotted prefix. Matches become
//! [`AnalysisReport::libraries`]; the rest, minus the app's own code and the
//! platform runtime, become untracked namespaces.

pub mod manifest;
pub mod metadata;
pub mod namespaces;
pub mod platform;

use manifest::ManifestInfo;
use metadata::ApktoolMeta;
use stackzy_core::{
    is_within_namespace, AnalysisReport, GradleInfo, LibraryCatalog, Result, StackzyError,
};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Bytes per reported megabyte
const BYTES_PER_MB: f64 = 1_000_000.0;

/// Analyzer tuning
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Segments kept when reporting an untracked namespace
    pub namespace_depth: usize,

    /// Runtime namespaces never reported as untracked
    pub ignored_namespaces: Vec<String>,

    /// Drop minified namespaces such as `a.b.c`
    pub skip_obfuscated: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            namespace_depth: 3,
            ignored_namespaces: ["android", "java", "javax", "dalvik", "kotlin"]
                .into_iter()
                .map(String::from)
                .collect(),
            skip_obfuscated: true,
        }
    }
}

/// Scans decompiled trees against the library catalog
#[derive(Debug, Clone, Default)]
pub struct LibraryAnalyzer {
    options: AnalyzerOptions,
}

impl LibraryAnalyzer {
    #[must_use]
    pub const fn new(options: AnalyzerOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub const fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Analyse `decompiled_dir`, the decoded form of `binary`
    ///
    /// Fails with [`StackzyError::CatalogUnavailable`] before touching the
    /// tree if the catalog is absent or empty. The result only depends on
    /// the inputs, so repeated runs produce equal reports.
    pub fn analyze(
        &self,
        package_name: &str,
        binary: &Path,
        decompiled_dir: &Path,
        catalog: Option<&LibraryCatalog>,
    ) -> Result<AnalysisReport> {
        let catalog = require_catalog(catalog)?;
        if !decompiled_dir.is_dir() {
            return Err(StackzyError::DecompileFailure(format!(
                "decompiled directory {} does not exist",
                decompiled_dir.display()
            )));
        }

        let manifest = ManifestInfo::read(decompiled_dir)?.unwrap_or_default();
        let meta = ApktoolMeta::read(decompiled_dir).unwrap_or_default();
        let namespaces = namespaces::collect(decompiled_dir)?;

        let mut libraries = BTreeSet::new();
        let mut untracked = BTreeSet::new();
        for namespace in &namespaces {
            if let Some(library) = catalog.match_namespace(namespace) {
                libraries.insert(library);
            } else if let Some(name) = self.untracked_name(package_name, namespace) {
                untracked.insert(name.to_string());
            }
        }

        let platform = platform::detect(decompiled_dir, &namespaces);
        let assets = decompiled_dir.join("assets");
        let size = std::fs::metadata(binary)?.len();

        #[allow(clippy::cast_precision_loss)]
        let apk_size_in_mb = size as f64 / BYTES_PER_MB;

        debug!(
            package = package_name,
            namespaces = namespaces.len(),
            libraries = libraries.len(),
            untracked = untracked.len(),
            %platform,
            "analysis finished"
        );

        Ok(AnalysisReport {
            app_name: manifest
                .app_name(decompiled_dir)
                .unwrap_or_else(|| package_name.to_string()),
            package_name: package_name.to_string(),
            platform,
            libraries,
            untracked_libraries: untracked,
            apk_size_in_mb,
            assets_dir: assets.is_dir().then_some(assets),
            gradle_info: GradleInfo {
                version_name: meta.version_name.or(manifest.version_name),
                version_code: meta.version_code.or(manifest.version_code),
                min_sdk: meta.min_sdk.or(manifest.min_sdk),
                target_sdk: meta.target_sdk.or(manifest.target_sdk),
            },
            permissions: manifest.permissions,
        })
    }

    /// Name under which an unmatched namespace is reported, if at all
    fn untracked_name<'a>(&self, package_name: &str, namespace: &'a str) -> Option<&'a str> {
        if is_within_namespace(namespace, package_name) {
            return None;
        }
        if self
            .options
            .ignored_namespaces
            .iter()
            .any(|ignored| is_within_namespace(namespace, ignored))
        {
            return None;
        }
        if self.options.skip_obfuscated && namespaces::looks_obfuscated(namespace) {
            return None;
        }
        let name = namespaces::truncate(namespace, self.options.namespace_depth);
        if !is_within_namespace(package_name, name) {
            return Some(name);
        }

        // the truncated prefix is a parent of the app: keep one segment past
        // what the namespace shares with the app's package
        let shared = namespace
            .split('.')
            .zip(package_name.split('.'))
            .take_while(|(ours, theirs)| ours == theirs)
            .count();
        let name = namespaces::truncate(namespace, shared + 1);
        (!is_within_namespace(package_name, name)).then_some(name)
    }
}

/// Reject an absent or empty catalog
pub fn require_catalog(catalog: Option<&LibraryCatalog>) -> Result<&LibraryCatalog> {
    match catalog {
        None => Err(StackzyError::CatalogUnavailable("no library catalog loaded".into())),
        Some(catalog) if catalog.is_empty() => {
            Err(StackzyError::CatalogUnavailable("library catalog is empty".into()))
        }
        Some(catalog) => Ok(catalog),
    }
}
