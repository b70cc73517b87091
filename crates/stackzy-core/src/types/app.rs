use serde::{Deserialize, Serialize};

use crate::error::{Result, StackzyError};

/// Identifies a cacheable analysis result
///
/// Two fingerprints are equal iff package name, version code and analyzer
/// version all match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageFingerprint {
    /// Application package name (e.g. `com.example.app`)
    pub package_name: String,

    /// Android `versionCode` of the analysed build
    pub version_code: u64,

    /// Version of the library catalog / analyzer that produced the result
    pub analyzer_version: String,
}

impl std::fmt::Display for PackageFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{} (analyzer {})",
            self.package_name, self.version_code, self.analyzer_version
        )
    }
}

/// The application a pipeline run is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppTarget {
    package_name: String,

    #[serde(default)]
    app_name: Option<String>,

    #[serde(default)]
    version_code: Option<u64>,

    #[serde(default)]
    version_name: Option<String>,
}

impl AppTarget {
    /// Create a target for the given package name
    ///
    /// The package name keys a directory on disk, so it must be a plain
    /// dotted identifier.
    pub fn new(package_name: impl Into<String>) -> Result<Self> {
        let package_name = package_name.into();
        validate_package_name(&package_name)?;
        Ok(Self {
            package_name,
            app_name: None,
            version_code: None,
            version_name: None,
        })
    }

    /// Set the known version code
    #[must_use]
    pub const fn with_version_code(mut self, version_code: u64) -> Self {
        self.version_code = Some(version_code);
        self
    }

    /// Set the known version name
    #[must_use]
    pub fn with_version_name(mut self, version_name: impl Into<String>) -> Self {
        self.version_name = Some(version_name.into());
        self
    }

    /// Set the display name shown by the device or the store listing
    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    #[must_use]
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    #[must_use]
    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    #[must_use]
    pub const fn version_code(&self) -> Option<u64> {
        self.version_code
    }

    #[must_use]
    pub fn version_name(&self) -> Option<&str> {
        self.version_name.as_deref()
    }

    /// Build the cache fingerprint, if the version code is known
    #[must_use]
    pub fn fingerprint(&self, analyzer_version: &str) -> Option<PackageFingerprint> {
        self.version_code.map(|version_code| PackageFingerprint {
            package_name: self.package_name.clone(),
            version_code,
            analyzer_version: analyzer_version.to_string(),
        })
    }
}

/// Check that a package name is a dotted Java-style identifier.
pub fn validate_package_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(StackzyError::InvalidInput(format!(
            "invalid package name '{name}': {reason}"
        )))
    };

    if name.is_empty() {
        return invalid("empty");
    }

    for segment in name.split('.') {
        if segment.is_empty() {
            return invalid("empty segment");
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return invalid("only letters, digits and '_' are allowed");
        }
    }

    Ok(())
}

/// Returns true if `name` equals `namespace` or is nested below it.
///
/// `com.example.app.ui` is within `com.example.app`; `com.example.apps` is not.
#[must_use]
pub fn is_within_namespace(name: &str, namespace: &str) -> bool {
    name.strip_prefix(namespace)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_requires_version_code() {
        let target = AppTarget::new("com.example.app").unwrap();
        assert!(target.fingerprint("1.0").is_none());

        let target = target.with_version_code(42);
        let fp = target.fingerprint("1.0").unwrap();
        assert_eq!(fp.package_name, "com.example.app");
        assert_eq!(fp.version_code, 42);
        assert_eq!(fp.analyzer_version, "1.0");
    }

    #[test]
    fn test_fingerprint_equality() {
        let target = AppTarget::new("com.example.app")
            .unwrap()
            .with_version_code(42);
        assert_eq!(target.fingerprint("1.0"), target.fingerprint("1.0"));
        assert_ne!(target.fingerprint("1.0"), target.fingerprint("1.1"));
    }

    #[test]
    fn test_package_name_validation() {
        assert!(AppTarget::new("com.example.app").is_ok());
        assert!(AppTarget::new("com.example.my_app2").is_ok());
        assert!(AppTarget::new("").is_err());
        assert!(AppTarget::new("com..app").is_err());
        assert!(AppTarget::new("../etc").is_err());
        assert!(AppTarget::new("com/example").is_err());
    }

    #[test]
    fn test_is_within_namespace() {
        assert!(is_within_namespace("com.example.app", "com.example.app"));
        assert!(is_within_namespace("com.example.app.ui", "com.example.app"));
        assert!(!is_within_namespace("com.example.apps", "com.example.app"));
        assert!(!is_within_namespace("com.example", "com.example.app"));
    }
}
