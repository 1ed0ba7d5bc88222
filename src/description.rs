use crate::{DepHasher, Error, RResult};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One on-disk instance of a package, read from its manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: String,
    pub dependencies: IndexMap<String, String>,
    pub optional_dependencies: Option<IndexMap<String, String>>,
    /// Real path of the manifest file.
    pub manifest_path: PathBuf,
    /// The directory holding the manifest.
    pub base_dir: PathBuf,
}

/// `(name, version, base_dir)`: two descriptors with equal keys are the same instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub name: String,
    pub version: String,
    pub base_dir: PathBuf,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    dependencies: IndexMap<String, String>,
    optional_dependencies: Option<IndexMap<String, String>>,
}

impl PackageDescriptor {
    pub(crate) fn parse(content: &str, manifest_path: &Path) -> RResult<Self> {
        let raw: RawManifest = tracing::debug_span!("serde_json_from_str").in_scope(|| {
            serde_json::from_str(content)
                .map_err(|error| Error::UnexpectedJson(manifest_path.into(), error))
        })?;
        let base_dir = manifest_path
            .parent()
            .map_or_else(|| manifest_path.to_path_buf(), Path::to_path_buf);

        Ok(Self {
            name: raw.name,
            version: raw.version,
            dependencies: raw.dependencies,
            optional_dependencies: raw.optional_dependencies,
            manifest_path: manifest_path.to_path_buf(),
            base_dir,
        })
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            name: self.name.clone(),
            version: self.version.clone(),
            base_dir: self.base_dir.clone(),
        }
    }

    /// Names to descend into, in visiting order. Optional dependencies come
    /// first, the way npm merges the two maps; a name listed in both is
    /// returned once.
    pub fn dependency_names(&self, include_optional: bool) -> Vec<&str> {
        let optional = self
            .optional_dependencies
            .iter()
            .filter(|_| include_optional)
            .flat_map(|deps| deps.keys());
        let mut names: IndexMap<&str, ()> = IndexMap::new();
        for name in optional.chain(self.dependencies.keys()) {
            names.entry(name.as_str()).or_insert(());
        }
        names.into_keys().collect()
    }
}

impl DepHasher {
    /// Reads the manifest at `manifest_path`, which must already be a real path.
    pub(crate) fn load_descriptor(&self, manifest_path: &Path) -> RResult<Arc<PackageDescriptor>> {
        if let Some(cached) = self.caches.manifest.get(&manifest_path.to_path_buf()) {
            return Ok(cached);
        }
        let content = std::fs::read_to_string(manifest_path)?;
        let descriptor = Arc::new(PackageDescriptor::parse(&content, manifest_path)?);
        Ok(self
            .caches
            .manifest
            .set(manifest_path.to_path_buf(), descriptor))
    }
}
