use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::app::PackageFingerprint;
use super::report::{AnalysisReport, GradleInfo};
use crate::error::Result;

/// Remote-cache projection of an [`AnalysisReport`]
///
/// Libraries and permissions are flattened to comma-joined strings and the
/// gradle info travels as a JSON blob. Untracked libraries are not carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    pub app_name: String,
    pub package_name: String,
    pub version_code: u64,

    #[serde(default)]
    pub version_name: Option<String>,

    /// Analyzer version that produced the entry
    pub analyzer_version: String,

    /// [`Platform::class_name`](super::report::Platform::class_name)
    pub platform: String,

    /// Comma-joined library package names
    pub lib_packages: String,

    /// Comma-joined permissions
    #[serde(default)]
    pub permissions: Option<String>,

    pub apk_size_in_mb: f64,

    /// Serialized [`GradleInfo`]
    pub gradle_info_json: String,

    /// Set by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl CachedResult {
    /// Project a report for the given fingerprint.
    pub fn from_report(report: &AnalysisReport, fingerprint: &PackageFingerprint) -> Result<Self> {
        let lib_packages = report.library_packages().collect::<Vec<_>>().join(",");
        let permissions = if report.permissions.is_empty() {
            None
        } else {
            Some(report.permissions.join(","))
        };

        Ok(Self {
            app_name: report.app_name.clone(),
            package_name: fingerprint.package_name.clone(),
            version_code: fingerprint.version_code,
            version_name: report.gradle_info.version_name.clone(),
            analyzer_version: fingerprint.analyzer_version.clone(),
            platform: report.platform.class_name().to_string(),
            lib_packages,
            permissions,
            apk_size_in_mb: report.apk_size_in_mb,
            gradle_info_json: serde_json::to_string(&report.gradle_info)?,
            created_at: None,
        })
    }

    /// The fingerprint this entry is stored under
    #[must_use]
    pub fn fingerprint(&self) -> PackageFingerprint {
        PackageFingerprint {
            package_name: self.package_name.clone(),
            version_code: self.version_code,
            analyzer_version: self.analyzer_version.clone(),
        }
    }

    /// Library package names, blanks removed
    pub fn library_packages(&self) -> impl Iterator<Item = &str> {
        split_list(&self.lib_packages)
    }

    /// Permissions in stored order, blanks removed
    #[must_use]
    pub fn permission_list(&self) -> Vec<String> {
        self.permissions
            .as_deref()
            .map(|p| split_list(p).map(String::from).collect())
            .unwrap_or_default()
    }

    /// Decode the gradle info blob
    pub fn gradle_info(&self) -> Result<GradleInfo> {
        Ok(serde_json::from_str(&self.gradle_info_json)?)
    }
}

fn split_list(joined: &str) -> impl Iterator<Item = &str> {
    joined.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Library, LibraryCatalog, Platform};
    use std::collections::BTreeSet;

    fn report() -> AnalysisReport {
        let catalog = LibraryCatalog::new([
            Library::new("OkHttp", "okhttp3"),
            Library::new("Retrofit", "retrofit2"),
        ]);
        AnalysisReport {
            app_name: "Example".into(),
            package_name: "com.example.app".into(),
            platform: Platform::NativeKotlin,
            libraries: catalog.resolve(["retrofit2", "okhttp3"]),
            untracked_libraries: BTreeSet::from(["io.unknown".to_string()]),
            apk_size_in_mb: 12.5,
            assets_dir: None,
            permissions: vec![
                "android.permission.INTERNET".into(),
                "android.permission.CAMERA".into(),
            ],
            gradle_info: GradleInfo {
                version_name: Some("1.0".into()),
                version_code: Some(42),
                min_sdk: Some(21),
                target_sdk: Some(34),
            },
        }
    }

    fn fingerprint() -> PackageFingerprint {
        PackageFingerprint {
            package_name: "com.example.app".into(),
            version_code: 42,
            analyzer_version: "1.0".into(),
        }
    }

    #[test]
    fn test_from_report_flattens_lists() {
        let result = CachedResult::from_report(&report(), &fingerprint()).unwrap();
        assert_eq!(result.lib_packages, "okhttp3,retrofit2");
        assert_eq!(
            result.permissions.as_deref(),
            Some("android.permission.INTERNET,android.permission.CAMERA")
        );
        assert_eq!(result.platform, "NativeKotlin");
        assert_eq!(result.fingerprint(), fingerprint());
        assert_eq!(result.gradle_info().unwrap(), report().gradle_info);
    }

    #[test]
    fn test_split_ignores_blanks() {
        let mut result = CachedResult::from_report(&report(), &fingerprint()).unwrap();
        result.lib_packages = "okhttp3, ,retrofit2,".into();
        result.permissions = None;
        let libs: Vec<_> = result.library_packages().collect();
        assert_eq!(libs, vec!["okhttp3", "retrofit2"]);
        assert!(result.permission_list().is_empty());
    }

    #[test]
    fn test_deserialize_server_payload() {
        let json = r#"{
            "app_name": "Example",
            "package_name": "com.example.app",
            "version_code": 42,
            "analyzer_version": "1.0",
            "platform": "Flutter",
            "lib_packages": "okhttp3",
            "apk_size_in_mb": 3.2,
            "gradle_info_json": "{\"version_name\":\"1.0\"}",
            "created_at": "2024-03-01T10:00:00Z"
        }"#;
        let result: CachedResult = serde_json::from_str(json).unwrap();
        assert!(result.permissions.is_none());
        assert!(result.created_at.is_some());
        assert_eq!(result.gradle_info().unwrap().version_name.as_deref(), Some("1.0"));
    }
}
