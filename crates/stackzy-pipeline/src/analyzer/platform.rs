//! Framework detection from build markers.

use stackzy_core::Platform;
use std::collections::BTreeSet;
use std::path::Path;
use walkdir::WalkDir;

use stackzy_core::is_within_namespace;

/// Classify the app by the framework artifacts it ships
///
/// Cross-platform frameworks are checked before the Kotlin/Java split,
/// since their host apps are themselves Java or Kotlin.
#[must_use]
pub fn detect(decompiled_dir: &Path, namespaces: &BTreeSet<String>) -> Platform {
    let assets = decompiled_dir.join("assets");
    let has_namespace = |ns: &str| namespaces.iter().any(|n| is_within_namespace(n, ns));

    if has_native_lib(decompiled_dir, "libflutter.so") || assets.join("flutter_assets").is_dir() {
        Platform::Flutter
    } else if has_native_lib(decompiled_dir, "libreactnativejni.so")
        || assets.join("index.android.bundle").is_file()
        || has_namespace("com.facebook.react")
    {
        Platform::ReactNative
    } else if assets.join("www/cordova.js").is_file() || has_namespace("org.apache.cordova") {
        Platform::Cordova
    } else if has_native_lib(decompiled_dir, "libmonodroid.so")
        || decompiled_dir.join("assemblies").is_dir()
        || decompiled_dir.join("unknown/assemblies").is_dir()
        || has_namespace("mono.android")
    {
        Platform::Xamarin
    } else if has_native_lib(decompiled_dir, "libunity.so") || has_namespace("com.unity3d.player") {
        Platform::Unity
    } else if has_namespace("kotlin") || has_kotlin_module(decompiled_dir) {
        Platform::NativeKotlin
    } else {
        Platform::NativeJava
    }
}

/// `lib/<abi>/<name>` for any ABI
fn has_native_lib(decompiled_dir: &Path, name: &str) -> bool {
    std::fs::read_dir(decompiled_dir.join("lib")).is_ok_and(|abis| {
        abis.filter_map(std::result::Result::ok)
            .any(|abi| abi.path().join(name).is_file())
    })
}

/// Kotlin compiler metadata kept under `unknown/META-INF` or `original/META-INF`
fn has_kotlin_module(decompiled_dir: &Path) -> bool {
    ["unknown", "original"].iter().any(|dir| {
        WalkDir::new(decompiled_dir.join(dir).join("META-INF"))
            .max_depth(3)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .any(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == "kotlin_module")
            })
    })
}
