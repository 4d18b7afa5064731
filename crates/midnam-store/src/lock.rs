use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

/// One mutex per document path, so that concurrent edits of the same file
/// are serialised while different files proceed independently.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock slot for `path`, keyed by its canonical form when it exists.
    pub fn slot(&self, path: &Path) -> Arc<Mutex<()>> {
        self.entry(path).1
    }

    fn entry(&self, path: &Path) -> (PathBuf, Arc<Mutex<()>>) {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = Arc::clone(locks.entry(key.clone()).or_default());
        (key, slot)
    }

    /// Run `f` while holding the lock for `path`. Poisoned locks are
    /// reclaimed, and the slot is dropped once nobody else holds or awaits it.
    pub fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let (key, slot) = self.entry(path);
        let result = {
            let _guard: MutexGuard<'_, ()> = slot.lock().unwrap_or_else(PoisonError::into_inner);
            trace!(path = %path.display(), "acquired document lock");
            f()
        };
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here.
        if Arc::strong_count(&slot) == 2 {
            locks.remove(&key);
        }
        result
    }

    /// Number of paths with a live slot.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
