//! Class namespaces of a decompiled tree.

use std::collections::BTreeSet;
use std::path::Path;
use walkdir::WalkDir;

/// Top-level directories holding class files: apktool's `smali`,
/// `smali_classes2`, ... and jadx-style `sources`
fn is_class_root(name: &str) -> bool {
    name == "smali" || name.starts_with("smali_") || name == "sources"
}

fn is_class_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "smali" || ext == "java")
}

/// Every dotted namespace that directly contains at least one class
///
/// Classes in the default package are ignored.
pub fn collect(decompiled_dir: &Path) -> std::io::Result<BTreeSet<String>> {
    let mut namespaces = BTreeSet::new();

    let mut roots: Vec<_> = std::fs::read_dir(decompiled_dir)?
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter(|entry| entry.file_name().to_str().is_some_and(is_class_root))
        .map(|entry| entry.path())
        .collect();
    roots.sort();

    for root in roots {
        for entry in WalkDir::new(&root).min_depth(2).into_iter().filter_map(std::result::Result::ok) {
            if !entry.file_type().is_file() || !is_class_file(entry.path()) {
                continue;
            }
            let Some(parent) = entry.path().parent() else {
                continue;
            };
            let Ok(relative) = parent.strip_prefix(&root) else {
                continue;
            };
            let segments: Vec<_> = relative
                .components()
                .filter_map(|c| c.as_os_str().to_str())
                .collect();
            if !segments.is_empty() {
                namespaces.insert(segments.join("."));
            }
        }
    }

    Ok(namespaces)
}

/// Keep the first `depth` segments of a namespace
#[must_use]
pub fn truncate(namespace: &str, depth: usize) -> &str {
    match namespace.match_indices('.').nth(depth.saturating_sub(1)) {
        Some((idx, _)) if depth > 0 => &namespace[..idx],
        _ => namespace,
    }
}

/// Heuristic for minified namespaces such as `a.b.c` or `ab.c`
///
/// Every segment is at most two characters and at least one is a single
/// character, so short real packages like `io.ab` are kept.
#[must_use]
pub fn looks_obfuscated(namespace: &str) -> bool {
    namespace.split('.').all(|segment| segment.len() <= 2)
        && namespace.split('.').any(|segment| segment.len() == 1)
}
