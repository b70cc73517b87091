//! On-disk layout of decompiled packages.

use std::path::{Path, PathBuf};

/// Directory under the temp root shared by all runs
pub const WORKSPACE_DIR: &str = "stackzy";

/// `<temp_root>/stackzy/<package_name>`
#[must_use]
pub fn decompiled_dir(temp_root: &Path, package_name: &str) -> PathBuf {
    temp_root.join(WORKSPACE_DIR).join(package_name)
}

/// The system temp directory
#[must_use]
pub fn default_temp_root() -> PathBuf {
    std::env::temp_dir()
}

/// Returns true if `dir` exists and has at least one entry
#[must_use]
pub fn is_populated(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_some())
}
