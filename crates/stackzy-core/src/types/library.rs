use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// A known third-party library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// Catalog identifier
    #[serde(default)]
    pub id: Option<u32>,

    /// Human-readable name (e.g. "OkHttp")
    pub name: String,

    /// Package prefix that identifies the library (e.g. `okhttp3`)
    pub package_name: String,

    /// Category (e.g. "Networking")
    #[serde(default)]
    pub category: Option<String>,

    /// Project website
    #[serde(default)]
    pub website: Option<String>,

    /// Logo URL
    #[serde(default)]
    pub thumb_url: Option<String>,
}

impl Library {
    #[must_use]
    pub fn new(name: impl Into<String>, package_name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            package_name: package_name.into(),
            category: None,
            website: None,
            thumb_url: None,
        }
    }
}

/// Shared reference to a catalog entry
///
/// Ordered and compared by package name only, so a set of refs never holds
/// two entries for the same package.
#[derive(Debug, Clone)]
pub struct LibraryRef(Arc<Library>);

impl LibraryRef {
    #[must_use]
    pub fn package_name(&self) -> &str {
        &self.0.package_name
    }
}

impl std::ops::Deref for LibraryRef {
    type Target = Library;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for LibraryRef {
    fn eq(&self, other: &Self) -> bool {
        self.package_name() == other.package_name()
    }
}

impl Eq for LibraryRef {}

impl PartialOrd for LibraryRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LibraryRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.package_name().cmp(other.package_name())
    }
}

impl Serialize for LibraryRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Read-only lookup of known libraries, keyed by package name
#[derive(Debug, Clone, Default)]
pub struct LibraryCatalog {
    entries: BTreeMap<String, LibraryRef>,
}

impl LibraryCatalog {
    /// Build a catalog; the first entry wins when package names repeat.
    pub fn new(libraries: impl IntoIterator<Item = Library>) -> Self {
        let mut entries = BTreeMap::new();
        for library in libraries {
            let key = library.package_name.trim().to_string();
            if key.is_empty() {
                continue;
            }
            entries
                .entry(key)
                .or_insert_with(|| LibraryRef(Arc::new(library)));
        }
        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup by package name
    #[must_use]
    pub fn get(&self, package_name: &str) -> Option<LibraryRef> {
        self.entries.get(package_name).cloned()
    }

    /// Find the most specific library whose package is `namespace` or one
    /// of its parent namespaces.
    #[must_use]
    pub fn match_namespace(&self, namespace: &str) -> Option<LibraryRef> {
        let mut candidate = namespace;
        loop {
            if let Some(library) = self.entries.get(candidate) {
                return Some(library.clone());
            }
            match candidate.rfind('.') {
                Some(idx) => candidate = &candidate[..idx],
                None => return None,
            }
        }
    }

    /// Resolve exact package names; unknown packages are dropped.
    pub fn resolve<'a>(&self, packages: impl IntoIterator<Item = &'a str>) -> BTreeSet<LibraryRef> {
        packages
            .into_iter()
            .filter_map(|package| self.get(package.trim()))
            .collect()
    }

    /// Iterate over all entries in package-name order
    pub fn iter(&self) -> impl Iterator<Item = &LibraryRef> {
        self.entries.values()
    }
}

impl FromIterator<Library> for LibraryCatalog {
    fn from_iter<T: IntoIterator<Item = Library>>(iter: T) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> LibraryCatalog {
        LibraryCatalog::new([
            Library::new("OkHttp", "com.squareup.okhttp"),
            Library::new("Firebase", "com.google.firebase"),
            Library::new("Firebase Analytics", "com.google.firebase.analytics"),
            Library::new("Duplicate", "com.squareup.okhttp"),
        ])
    }

    #[test]
    fn test_first_entry_wins() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get("com.squareup.okhttp").unwrap().name, "OkHttp");
    }

    #[test]
    fn test_match_namespace_prefers_most_specific() {
        let catalog = catalog();
        let lib = catalog
            .match_namespace("com.google.firebase.analytics.connector")
            .unwrap();
        assert_eq!(lib.package_name(), "com.google.firebase.analytics");

        let lib = catalog.match_namespace("com.google.firebase.auth").unwrap();
        assert_eq!(lib.package_name(), "com.google.firebase");

        assert!(catalog.match_namespace("com.google").is_none());
        assert!(catalog.match_namespace("com.squareup.okhttpx").is_none());
    }

    #[test]
    fn test_resolve_drops_unknown() {
        let catalog = catalog();
        let resolved = catalog.resolve(["com.squareup.okhttp", " com.google.firebase", "io.unknown"]);
        let names: Vec<_> = resolved.iter().map(LibraryRef::package_name).collect();
        assert_eq!(names, vec!["com.google.firebase", "com.squareup.okhttp"]);
    }

    #[test]
    fn test_library_ref_serializes_as_library() {
        let catalog = catalog();
        let lib = catalog.get("com.squareup.okhttp").unwrap();
        let json = serde_json::to_value(&lib).unwrap();
        assert_eq!(json["name"], "OkHttp");
        assert_eq!(json["package_name"], "com.squareup.okhttp");
    }
}
