use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::library::LibraryRef;
use crate::error::{Result, StackzyError};

/// Framework the application was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    /// Plain Android, Java sources
    NativeJava,
    /// Plain Android, Kotlin sources
    NativeKotlin,
    /// Flutter
    Flutter,
    /// React Native
    ReactNative,
    /// Apache Cordova / PhoneGap
    Cordova,
    /// Xamarin / .NET for Android
    Xamarin,
    /// Unity
    Unity,
}

impl Platform {
    const ALL: [Self; 7] = [
        Self::NativeJava,
        Self::NativeKotlin,
        Self::Flutter,
        Self::ReactNative,
        Self::Cordova,
        Self::Xamarin,
        Self::Unity,
    ];

    /// Name stored in the remote cache
    #[must_use]
    pub const fn class_name(&self) -> &'static str {
        match self {
            Self::NativeJava => "NativeJava",
            Self::NativeKotlin => "NativeKotlin",
            Self::Flutter => "Flutter",
            Self::ReactNative => "ReactNative",
            Self::Cordova => "Cordova",
            Self::Xamarin => "Xamarin",
            Self::Unity => "Unity",
        }
    }

    /// Parse a cached class name, qualified (`...Platform$Flutter`) or not
    pub fn from_class_name(name: &str) -> Result<Self> {
        let simple = name
            .rsplit(['$', '.'])
            .next()
            .unwrap_or(name)
            .trim();

        Self::ALL
            .into_iter()
            .find(|p| p.class_name() == simple)
            .ok_or_else(|| StackzyError::InvalidInput(format!("unknown platform '{name}'")))
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NativeJava => write!(f, "Java"),
            Self::NativeKotlin => write!(f, "Kotlin"),
            Self::Flutter => write!(f, "Flutter"),
            Self::ReactNative => write!(f, "React Native"),
            Self::Cordova => write!(f, "Cordova"),
            Self::Xamarin => write!(f, "Xamarin"),
            Self::Unity => write!(f, "Unity"),
        }
    }
}

/// Build metadata recovered from the decompiled package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradleInfo {
    #[serde(default)]
    pub version_name: Option<String>,

    #[serde(default)]
    pub version_code: Option<u64>,

    #[serde(default)]
    pub min_sdk: Option<u32>,

    #[serde(default)]
    pub target_sdk: Option<u32>,
}

/// The result of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub app_name: String,
    pub package_name: String,
    pub platform: Platform,

    /// Catalog libraries found in the package
    pub libraries: BTreeSet<LibraryRef>,

    /// Namespaces unknown to the catalog and outside the app's own package
    pub untracked_libraries: BTreeSet<String>,

    pub apk_size_in_mb: f64,

    /// Decoded `assets/` directory, absent for cache hits
    pub assets_dir: Option<PathBuf>,

    /// Declared permissions in first-seen order
    pub permissions: Vec<String>,

    pub gradle_info: GradleInfo,
}

impl AnalysisReport {
    /// Store listing of the package
    #[must_use]
    pub fn play_store_url(&self) -> String {
        format!(
            "https://play.google.com/store/apps/details?id={}",
            self.package_name
        )
    }

    /// File name given to the binary when it is kept next to the decompiled tree
    #[must_use]
    pub fn binary_file_name(&self) -> String {
        let version = self
            .gradle_info
            .version_name
            .clone()
            .or_else(|| self.gradle_info.version_code.map(|c| c.to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        format!("{}_{version}.apk", self.package_name)
    }

    /// Package names of the matched libraries, sorted
    pub fn library_packages(&self) -> impl Iterator<Item = &str> {
        self.libraries.iter().map(LibraryRef::package_name)
    }
}
