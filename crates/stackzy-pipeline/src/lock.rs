//! Process-wide serialization of work on one package.
//!
//! The decompiled directory is keyed by package name only, so two runs for
//! the same package would clobber each other's output.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

type LockMap = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

static PACKAGE_LOCKS: LazyLock<Mutex<LockMap>> = LazyLock::new(|| Mutex::new(HashMap::new()));

/// Held while a package's decompiled directory is being written
///
/// Dropping the last guard of a package with no waiters removes its entry
/// from the registry.
#[derive(Debug)]
pub struct PackageGuard {
    package_name: String,
    mutex: Arc<tokio::sync::Mutex<()>>,
    _guard: OwnedMutexGuard<()>,
}

impl PackageGuard {
    #[must_use]
    pub fn package_name(&self) -> &str {
        &self.package_name
    }
}

/// Wait until no other run in this process works on `package_name`
pub async fn lock_package(package_name: &str) -> PackageGuard {
    let mutex = {
        let mut locks = PACKAGE_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(package_name.to_string()).or_default())
    };

    tracing::trace!(package = package_name, "waiting for package lock");
    PackageGuard {
        package_name: package_name.to_string(),
        mutex: Arc::clone(&mutex),
        _guard: mutex.lock_owned().await,
    }
}

impl Drop for PackageGuard {
    fn drop(&mut self) {
        let mut locks = PACKAGE_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
        // registry, this guard's handle and the owned lock guard
        let idle = locks
            .get(&self.package_name)
            .is_some_and(|entry| Arc::ptr_eq(entry, &self.mutex) && Arc::strong_count(entry) == 3);
        if idle {
            locks.remove(&self.package_name);
        }
    }
}
