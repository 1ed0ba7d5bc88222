use crate::description::PackageDescriptor;
use crate::entry::{ModuleEntry, ModuleKey};
use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::{BuildHasherDefault, Hash};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Memoizing key -> value store. Entries never expire, they only leave
/// through `delete` or `reset`.
///
/// A key stored with a "nothing" value (e.g. `None`) is still present:
/// that is how negative lookups are remembered.
#[derive(Debug)]
pub struct PathCache<K: Eq + Hash, V> {
    entries: DashMap<K, V, BuildHasherDefault<FxHasher>>,
}

impl<K: Eq + Hash, V> Default for PathCache<K, V> {
    fn default() -> Self {
        Self {
            entries: DashMap::default(),
        }
    }
}

impl<K: Eq + Hash, V: Clone> PathCache<K, V> {
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|value| value.clone())
    }

    pub fn set(&self, key: K, value: V) -> V {
        self.entries.insert(key, value.clone());
        value
    }

    pub fn has(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn delete(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn reset(&self) {
        self.entries.clear();
    }
}

/// The caches of one resolution session, cleared together.
#[derive(Debug, Default)]
pub struct CacheGroup {
    /// candidate manifest path -> its real path, `None` when it is not a file
    pub real_file_path: PathCache<PathBuf, Option<PathBuf>>,
    /// candidate directory -> its real path, `None` when it is not a directory
    pub real_directory_path: PathCache<PathBuf, Option<PathBuf>>,
    /// real manifest path -> parsed manifest
    pub manifest: PathCache<PathBuf, Arc<PackageDescriptor>>,
    /// Only complete entries are stored here, see `DepHasher::locate`.
    pub module_entry: PathCache<ModuleKey, Arc<ModuleEntry>>,
    /// Held while new module entries are built and published.
    pub(crate) build_lock: Mutex<()>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheSizes {
    pub real_file_path: usize,
    pub real_directory_path: usize,
    pub manifest: usize,
    pub module_entry: usize,
}

impl CacheGroup {
    pub fn reset(&self) {
        self.real_file_path.reset();
        self.real_directory_path.reset();
        self.manifest.reset();
        self.module_entry.reset();
    }

    pub fn sizes(&self) -> CacheSizes {
        CacheSizes {
            real_file_path: self.real_file_path.size(),
            real_directory_path: self.real_directory_path.size(),
            manifest: self.manifest.size(),
            module_entry: self.module_entry.size(),
        }
    }
}
