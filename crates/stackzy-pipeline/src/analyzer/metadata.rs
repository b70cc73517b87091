//! `apktool.yml`, the metadata file apktool writes next to the decoded tree.

use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;

/// Version and SDK information from `apktool.yml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApktoolMeta {
    pub version_code: Option<u64>,
    pub version_name: Option<String>,
    pub min_sdk: Option<u32>,
    pub target_sdk: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMeta {
    #[serde(default)]
    sdk_info: Option<RawSdkInfo>,
    #[serde(default)]
    version_info: Option<RawVersionInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSdkInfo {
    #[serde(default)]
    min_sdk_version: Option<Value>,
    #[serde(default)]
    target_sdk_version: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVersionInfo {
    #[serde(default)]
    version_code: Option<Value>,
    #[serde(default)]
    version_name: Option<Value>,
}

impl ApktoolMeta {
    /// Parse the YAML document
    ///
    /// Older apktool releases prefix the document with a `!!brut...MetaInfo`
    /// type tag, which is dropped before parsing.
    pub fn parse(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let body: String = yaml
            .lines()
            .filter(|line| !line.trim_start().starts_with("!!"))
            .collect::<Vec<_>>()
            .join("\n");
        let raw: RawMeta = serde_yaml::from_str::<Option<RawMeta>>(&body)?.unwrap_or_default();

        let sdk = raw.sdk_info.unwrap_or_default();
        let version = raw.version_info.unwrap_or_default();
        Ok(Self {
            version_code: version.version_code.as_ref().and_then(as_number),
            version_name: version.version_name.as_ref().and_then(as_text),
            min_sdk: sdk.min_sdk_version.as_ref().and_then(as_number).and_then(|v| u32::try_from(v).ok()),
            target_sdk: sdk
                .target_sdk_version
                .as_ref()
                .and_then(as_number)
                .and_then(|v| u32::try_from(v).ok()),
        })
    }

    /// Read `apktool.yml` from a decompiled tree; unreadable files yield `None`
    #[must_use]
    pub fn read(decompiled_dir: &Path) -> Option<Self> {
        let yaml = std::fs::read_to_string(decompiled_dir.join("apktool.yml")).ok()?;
        match Self::parse(&yaml) {
            Ok(meta) => Some(meta),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable apktool.yml");
                None
            }
        }
    }
}

/// Numbers are quoted or not depending on the apktool release
fn as_number(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_legacy_format() {
        let yaml = "!!brut.androlib.meta.MetaInfo\n\
apkFileName: app.apk\n\
compressionType: false\n\
sdkInfo:\n  minSdkVersion: '21'\n  targetSdkVersion: '33'\n\
version: 2.6.0\n\
versionInfo:\n  versionCode: '42'\n  versionName: 1.0.3\n";
        let meta = ApktoolMeta::parse(yaml).unwrap();
        assert_eq!(meta.version_code, Some(42));
        assert_eq!(meta.version_name.as_deref(), Some("1.0.3"));
        assert_eq!(meta.min_sdk, Some(21));
        assert_eq!(meta.target_sdk, Some(33));
    }

    #[test]
    fn test_parse_unquoted_numbers() {
        let yaml = "version: 2.9.3\nsdkInfo:\n  minSdkVersion: 24\nversionInfo:\n  versionCode: 7\n  versionName: 2.0\n";
        let meta = ApktoolMeta::parse(yaml).unwrap();
        assert_eq!(meta.version_code, Some(7));
        assert_eq!(meta.version_name.as_deref(), Some("2.0"));
        assert_eq!(meta.min_sdk, Some(24));
        assert_eq!(meta.target_sdk, None);
    }

    #[test]
    fn test_parse_empty_document() {
        assert_eq!(ApktoolMeta::parse("").unwrap(), ApktoolMeta::default());
    }
}
