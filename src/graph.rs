use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;

use crate::description::{DedupKey, PackageDescriptor};
use crate::{DepHasher, Error, RResult};

/// Every package instance reachable from a root package, root first, then
/// in depth-first discovery order. Empty when the root does not exist.
#[derive(Debug, Clone, Default)]
pub struct DependencySet(Vec<Arc<PackageDescriptor>>);

impl DependencySet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<PackageDescriptor>> {
        self.0.iter()
    }

    pub fn root(&self) -> Option<&PackageDescriptor> {
        self.0.first().map(AsRef::as_ref)
    }

    /// Base directories in set order, each listed once.
    pub fn base_dirs(&self) -> Vec<&Path> {
        let mut seen: IndexMap<&Path, ()> = IndexMap::new();
        for package in &self.0 {
            seen.entry(package.base_dir.as_path()).or_insert(());
        }
        seen.into_keys().collect()
    }
}

impl<'a> IntoIterator for &'a DependencySet {
    type Item = &'a Arc<PackageDescriptor>;
    type IntoIter = std::slice::Iter<'a, Arc<PackageDescriptor>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl DepHasher {
    /// Walks the dependency graph of `name` resolved from `dir`.
    ///
    /// Each dependency is resolved from the base directory of the package
    /// declaring it. Dependencies that cannot be found are skipped.
    #[tracing::instrument(skip(self))]
    pub fn discover_dependencies(&self, name: &str, dir: Option<&Path>) -> RResult<DependencySet> {
        if name.is_empty() {
            return Err(Error::InvalidName(name.to_string()));
        }
        let start = self.start_dir(dir)?;
        let started = Instant::now();

        let mut visited = IndexMap::new();
        self.visit(name, &start, &mut visited)?;

        tracing::debug!(
            "dep discovery stats: dependencies={} elapsed={:?}",
            visited.len(),
            started.elapsed()
        );
        Ok(DependencySet(visited.into_values().collect()))
    }

    fn visit(
        &self,
        name: &str,
        dir: &Path,
        visited: &mut IndexMap<DedupKey, Arc<PackageDescriptor>>,
    ) -> RResult<()> {
        let Some(manifest) = self.resolve_from(name, dir)? else {
            tracing::debug!("skipping '{}', not found from {}", name, dir.display());
            return Ok(());
        };
        let package = self.load_descriptor(&manifest)?;
        let key = package.dedup_key();
        if visited.contains_key(&key) {
            return Ok(());
        }
        visited.insert(key, package.clone());

        for dependency in package.dependency_names(self.options.include_optional_deps) {
            self.visit(dependency, &package.base_dir, visited)?;
        }
        Ok(())
    }
}
