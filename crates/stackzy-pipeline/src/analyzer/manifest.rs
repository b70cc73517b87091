//! Decoded `AndroidManifest.xml` and string resources.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static MANIFEST_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<manifest\b[^>]*>").expect("static regex"));
static APPLICATION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<application\b[^>]*>").expect("static regex"));
static USES_SDK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<uses-sdk\b[^>]*>").expect("static regex"));
static PERMISSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<uses-permission(?:-sdk-23|-sdk-m)?\b[^>]*?\bandroid:name="([^"]+)""#)
        .expect("static regex")
});
static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\w:]+)\s*=\s*"([^"]*)""#).expect("static regex"));
static STRING_RESOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<string\s+name="([^"]+)"[^>]*>(.*?)</string>"#).expect("static regex")
});

/// Facts recovered from the manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestInfo {
    pub package: Option<String>,
    pub label: Option<String>,
    pub version_code: Option<u64>,
    pub version_name: Option<String>,
    pub min_sdk: Option<u32>,
    pub target_sdk: Option<u32>,
    /// Declared permissions, deduplicated in first-seen order
    pub permissions: Vec<String>,
}

impl ManifestInfo {
    /// Parse decoded manifest XML
    #[must_use]
    pub fn parse(xml: &str) -> Self {
        let manifest = tag_attribute_reader(&MANIFEST_TAG, xml);
        let application = tag_attribute_reader(&APPLICATION_TAG, xml);
        let uses_sdk = tag_attribute_reader(&USES_SDK_TAG, xml);

        let mut permissions: Vec<String> = Vec::new();
        for capture in PERMISSION.captures_iter(xml) {
            let name = capture[1].trim();
            if !name.is_empty() && !permissions.iter().any(|p| p == name) {
                permissions.push(name.to_string());
            }
        }

        Self {
            package: manifest("package"),
            label: application("android:label"),
            version_code: manifest("android:versionCode").and_then(|v| v.parse().ok()),
            version_name: manifest("android:versionName"),
            min_sdk: uses_sdk("android:minSdkVersion").and_then(|v| v.parse().ok()),
            target_sdk: uses_sdk("android:targetSdkVersion").and_then(|v| v.parse().ok()),
            permissions,
        }
    }

    /// Read `AndroidManifest.xml` from a decompiled tree, if present
    pub fn read(decompiled_dir: &Path) -> std::io::Result<Option<Self>> {
        match std::fs::read_to_string(decompiled_dir.join("AndroidManifest.xml")) {
            Ok(xml) => Ok(Some(Self::parse(&xml))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The application label, with `@string/` references resolved
    #[must_use]
    pub fn app_name(&self, decompiled_dir: &Path) -> Option<String> {
        let label = self.label.as_deref()?;
        let name = match label.strip_prefix("@string/") {
            Some(key) => string_resource(decompiled_dir, key),
            None if label.starts_with('@') => None,
            None => Some(label.to_string()),
        };
        name.filter(|name| !name.trim().is_empty())
    }
}

/// Returns a lookup over the attributes of the first `tag` match
fn tag_attribute_reader<'a>(tag: &Regex, xml: &'a str) -> impl Fn(&str) -> Option<String> + 'a {
    let element = tag.find(xml).map(|m| m.as_str());
    move |name: &str| {
        ATTRIBUTE
            .captures_iter(element?)
            .find(|c| &c[1] == name)
            .map(|c| unescape(&c[2]))
    }
}

/// Look up `key` in `res/values/strings.xml`
fn string_resource(decompiled_dir: &Path, key: &str) -> Option<String> {
    let xml = std::fs::read_to_string(decompiled_dir.join("res/values/strings.xml")).ok()?;
    STRING_RESOURCE
        .captures_iter(&xml)
        .find(|c| &c[1] == key)
        .map(|c| unescape(c[2].trim()))
}

fn unescape(value: &str) -> String {
    value
        .replace("\\'", "'")
        .replace("\\\"", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
