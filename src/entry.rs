use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, Weak};

use indexmap::IndexMap;
use once_cell::sync::OnceCell;

use crate::description::{DedupKey, PackageDescriptor};
use crate::digest::{join_hashes, missing_hash};
use crate::fingerprint::Fingerprint;
use crate::{DepHasher, Error, RResult};

/// Key of the module-entry cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleKey {
    /// A package found on disk, shared by every query resolving to it.
    Package(DedupKey),
    /// A query that resolved to nothing.
    Missing { name: String, dir: PathBuf },
}

#[derive(Debug)]
enum Dependency {
    Owned(Arc<ModuleEntry>),
    /// Points back to an entry that was still being built, i.e. a cycle.
    Cycle(Weak<ModuleEntry>),
}

impl Dependency {
    fn get(&self) -> Option<Arc<ModuleEntry>> {
        match self {
            Dependency::Owned(entry) => Some(entry.clone()),
            Dependency::Cycle(entry) => entry.upgrade(),
        }
    }
}

/// A resolved package plus its direct dependencies, hashed lazily.
pub struct ModuleEntry {
    name: String,
    version: String,
    root_dir: PathBuf,
    package: Option<Arc<PackageDescriptor>>,
    fingerprint: Arc<dyn Fingerprint>,
    /// Unset while the entry is being built.
    dependencies: OnceCell<Vec<Dependency>>,
    source_hash: OnceCell<String>,
    hash: OnceCell<String>,
}

impl fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("root_dir", &self.root_dir)
            .field("hash", &self.hash.get())
            .finish_non_exhaustive()
    }
}

impl ModuleEntry {
    fn found(package: Arc<PackageDescriptor>, fingerprint: Arc<dyn Fingerprint>) -> Self {
        Self {
            name: package.name.clone(),
            version: package.version.clone(),
            root_dir: package.base_dir.clone(),
            package: Some(package),
            fingerprint,
            dependencies: OnceCell::new(),
            source_hash: OnceCell::new(),
            hash: OnceCell::new(),
        }
    }

    fn missing(name: &str, dir: &Path, fingerprint: Arc<dyn Fingerprint>) -> Self {
        Self {
            name: name.to_string(),
            version: String::new(),
            root_dir: dir.to_path_buf(),
            package: None,
            fingerprint,
            dependencies: OnceCell::with_value(Vec::new()),
            source_hash: OnceCell::new(),
            hash: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The package's base directory, or the queried directory for a missing package.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn package(&self) -> Option<&Arc<PackageDescriptor>> {
        self.package.as_ref()
    }

    pub fn is_missing(&self) -> bool {
        self.package.is_none()
    }

    /// Direct dependencies that were found on disk, in declared order.
    pub fn dependencies(&self) -> Vec<Arc<ModuleEntry>> {
        self.dependencies
            .get()
            .into_iter()
            .flatten()
            .filter_map(Dependency::get)
            .collect()
    }

    /// Fingerprint of this package's own files.
    pub fn source_hash(&self) -> RResult<&str> {
        self.source_hash
            .get_or_try_init(|| self.fingerprint.fingerprint(&self.root_dir))
            .map(String::as_str)
    }

    /// Collects this entry and everything it reaches into `dependencies`,
    /// keyed by base directory, in depth-first pre-order. Entries already
    /// present are not visited again.
    pub fn gather_dependencies(
        self: &Arc<Self>,
        dependencies: &mut IndexMap<PathBuf, Arc<ModuleEntry>>,
    ) -> RResult<()> {
        if self.is_missing() || dependencies.contains_key(&self.root_dir) {
            return Ok(());
        }
        let Some(direct) = self.dependencies.get() else {
            return Err(Error::UnbuiltEntry(self.root_dir.as_path().into()));
        };
        dependencies.insert(self.root_dir.clone(), self.clone());

        for dependency in direct {
            let dependency = dependency
                .get()
                .ok_or_else(|| Error::StaleEntry(self.root_dir.as_path().into()))?;
            dependency.gather_dependencies(dependencies)?;
        }
        Ok(())
    }

    /// Combined hash of this package and all its transitive dependencies,
    /// computed on the first call.
    pub fn get_hash(self: &Arc<Self>) -> RResult<String> {
        self.hash
            .get_or_try_init(|| {
                if self.is_missing() {
                    return Ok(missing_hash(&self.name, &self.root_dir));
                }
                let mut dependencies = IndexMap::new();
                self.gather_dependencies(&mut dependencies)?;
                let hashes = dependencies
                    .values()
                    .map(|entry| entry.source_hash().map(str::to_owned))
                    .collect::<RResult<Vec<_>>>()?;
                tracing::debug!("hashing {} paths for '{}'", hashes.len(), self.name);
                Ok(join_hashes(&hashes))
            })
            .cloned()
    }
}

impl DepHasher {
    /// Finds or builds the entry for `name` resolved from `dir`.
    ///
    /// With `fingerprint` set the entry is built in a throwaway session so
    /// the stand-in never reaches this hasher's caches.
    #[tracing::instrument(skip(self, fingerprint))]
    pub fn locate(
        &self,
        name: &str,
        dir: Option<&Path>,
        fingerprint: Option<Arc<dyn Fingerprint>>,
    ) -> RResult<Arc<ModuleEntry>> {
        if name.is_empty() {
            return Err(Error::InvalidName(name.to_string()));
        }
        match fingerprint {
            Some(fingerprint) => {
                let session = self.isolated();
                let start = session.start_dir(dir)?;
                session.locate_from(name, &start, &fingerprint)
            }
            None => {
                let start = self.start_dir(dir)?;
                self.locate_from(name, &start, &self.fingerprint)
            }
        }
    }

    fn locate_from(
        &self,
        name: &str,
        start: &Path,
        fingerprint: &Arc<dyn Fingerprint>,
    ) -> RResult<Arc<ModuleEntry>> {
        if let Some(manifest) = self.resolve_from(name, start)? {
            let package = self.load_descriptor(&manifest)?;
            if let Some(cached) = self
                .caches
                .module_entry
                .get(&ModuleKey::Package(package.dedup_key()))
            {
                return Ok(cached);
            }

            // One builder per cache group, so every entry in the cache is complete
            // and a half-built entry is only ever seen by the call building it.
            let _guard = self
                .caches
                .build_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let mut building = IndexMap::new();
            let entry = self.locate_package(&manifest, fingerprint, &mut building)?;
            for (key, built) in building {
                self.caches.module_entry.set(key, built);
            }
            return Ok(entry);
        }
        let key = ModuleKey::Missing {
            name: name.to_string(),
            dir: start.to_path_buf(),
        };
        if let Some(cached) = self.caches.module_entry.get(&key) {
            return Ok(cached);
        }
        let entry = Arc::new(ModuleEntry::missing(name, start, fingerprint.clone()));
        Ok(self.caches.module_entry.set(key, entry))
    }

    /// `building` holds the entries created by the current call, which reach
    /// the shared cache only once all of them are complete.
    fn locate_package(
        &self,
        manifest: &Path,
        fingerprint: &Arc<dyn Fingerprint>,
        building: &mut IndexMap<ModuleKey, Arc<ModuleEntry>>,
    ) -> RResult<Arc<ModuleEntry>> {
        let package = self.load_descriptor(manifest)?;
        let key = ModuleKey::Package(package.dedup_key());
        if let Some(cached) = self.caches.module_entry.get(&key) {
            tracing::debug!("module entry cache hit for {}", package.base_dir.display());
            return Ok(cached);
        }
        if let Some(entry) = building.get(&key) {
            return Ok(entry.clone());
        }

        // Registered before its dependencies so a cycle finds it instead of recursing.
        let entry = Arc::new(ModuleEntry::found(package.clone(), fingerprint.clone()));
        building.insert(key, entry.clone());
        let dependencies = self.locate_dependencies(&package, fingerprint, building)?;
        if entry.dependencies.set(dependencies).is_err() {
            tracing::warn!("dependencies of {} were already set", package.base_dir.display());
        }
        Ok(entry)
    }

    fn locate_dependencies(
        &self,
        package: &PackageDescriptor,
        fingerprint: &Arc<dyn Fingerprint>,
        building: &mut IndexMap<ModuleKey, Arc<ModuleEntry>>,
    ) -> RResult<Vec<Dependency>> {
        let mut dependencies = Vec::new();
        for name in package.dependency_names(self.options.include_optional_deps) {
            let Some(manifest) = self.resolve_from(name, &package.base_dir)? else {
                continue;
            };
            let entry = self.locate_package(&manifest, fingerprint, building)?;
            let dependency = if entry.dependencies.get().is_some() {
                Dependency::Owned(entry)
            } else {
                Dependency::Cycle(Arc::downgrade(&entry))
            };
            dependencies.push(dependency);
        }
        Ok(dependencies)
    }
}
