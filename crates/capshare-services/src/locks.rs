//! Per-path advisory read/write locks.
//!
//! Acquisition never blocks: a caller that cannot take a lock right away gets
//! `None` and reports the path as busy. One mutex guards the whole table and
//! is held only for the map update, never across I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use capshare_core::ResolvedPath;

#[derive(Debug, Default)]
struct LockEntry {
    exclusive: bool,
    readers: usize,
}

#[derive(Clone, Default)]
pub struct PathLocks {
    table: Arc<Mutex<HashMap<ResolvedPath, LockEntry>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<ResolvedPath, LockEntry>> {
        // entries are updated atomically under the lock, so a poisoned table is still consistent
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take the write lock for `path`. Fails if any lock is held on it.
    pub fn try_exclusive(&self, path: &ResolvedPath) -> Option<ExclusiveGuard> {
        let mut table = self.table();
        if table.contains_key(path) {
            return None;
        }
        table.insert(
            path.clone(),
            LockEntry {
                exclusive: true,
                readers: 0,
            },
        );
        Some(ExclusiveGuard {
            locks: self.clone(),
            path: path.clone(),
        })
    }

    /// Take a read lock for `path`. Fails only while a writer holds it.
    pub fn try_shared(&self, path: &ResolvedPath) -> Option<SharedGuard> {
        let mut table = self.table();
        let entry = table.entry(path.clone()).or_default();
        if entry.exclusive {
            return None;
        }
        entry.readers += 1;
        Some(SharedGuard {
            locks: self.clone(),
            path: path.clone(),
        })
    }

    fn release_exclusive(&self, path: &ResolvedPath) {
        let mut table = self.table();
        if table.get(path).is_some_and(|e| e.exclusive) {
            table.remove(path);
        }
    }

    fn release_shared(&self, path: &ResolvedPath) {
        let mut table = self.table();
        if let Some(entry) = table.get_mut(path) {
            entry.readers = entry.readers.saturating_sub(1);
            if entry.readers == 0 && !entry.exclusive {
                table.remove(path);
            }
        }
    }

    pub fn is_locked(&self, path: &ResolvedPath) -> bool {
        self.table().contains_key(path)
    }

    /// Number of paths with at least one lock held.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }
}

/// Write lock on one path, released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ExclusiveGuard {
    locks: PathLocks,
    path: ResolvedPath,
}

impl ExclusiveGuard {
    pub fn release(self) {}
}

impl Drop for ExclusiveGuard {
    fn drop(&mut self) {
        self.locks.release_exclusive(&self.path);
    }
}

/// Read lock on one path, released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SharedGuard {
    locks: PathLocks,
    path: ResolvedPath,
}

impl SharedGuard {
    pub fn release(self) {}
}

impl Drop for SharedGuard {
    fn drop(&mut self) {
        self.locks.release_shared(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(token: &str) -> ResolvedPath {
        ResolvedPath::resolve("alice", token)
    }

    #[test]
    fn test_exclusive_excludes_everything() {
        let locks = PathLocks::new();
        let p = path("a");

        let guard = locks.try_exclusive(&p).unwrap();
        assert!(locks.try_exclusive(&p).is_none());
        assert!(locks.try_shared(&p).is_none());

        guard.release();
        assert!(!locks.is_locked(&p));
        assert!(locks.try_exclusive(&p).is_some());
    }

    #[test]
    fn test_shared_allows_readers_blocks_writer() {
        let locks = PathLocks::new();
        let p = path("a");

        let r1 = locks.try_shared(&p).unwrap();
        let r2 = locks.try_shared(&p).unwrap();
        assert!(locks.try_exclusive(&p).is_none());

        drop(r1);
        assert!(locks.try_exclusive(&p).is_none());
        drop(r2);
        assert!(locks.is_empty());
        assert!(locks.try_exclusive(&p).is_some());
    }

    #[test]
    fn test_failed_shared_leaves_writer_intact() {
        let locks = PathLocks::new();
        let p = path("a");
        let writer = locks.try_exclusive(&p).unwrap();

        assert!(locks.try_shared(&p).is_none());
        assert!(locks.try_shared(&p).is_none());
        drop(writer);

        assert!(locks.is_empty());
    }

    #[test]
    fn test_paths_are_independent() {
        let locks = PathLocks::new();
        let _a = locks.try_exclusive(&path("a")).unwrap();
        let _b = locks.try_exclusive(&path("b")).unwrap();
        assert_eq!(locks.len(), 2);
        // same token, different user
        assert!(locks
            .try_exclusive(&ResolvedPath::resolve("bob", "a"))
            .is_some());
    }

    #[test]
    fn test_concurrent_writers_one_wins() {
        let locks = PathLocks::new();
        let p = path("contended");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let locks = locks.clone();
                let p = p.clone();
                std::thread::spawn(move || locks.try_exclusive(&p))
            })
            .collect();

        let guards: Vec<ExclusiveGuard> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(guards.len(), 1);
    }
}
