use std::sync::Arc;

use crate::CacheGroup;

#[derive(Debug, Clone)]
pub struct Options {
    /// The manifest file describing a package.
    /// Default is `"package.json"`.
    pub description_file: String,
    /// Directory holding installed packages. It is compared
    /// case-insensitively, both when walking up to find a
    /// package and when fingerprinting a package's own files.
    /// Default is `"node_modules"`.
    pub modules: String,
    /// Descend into `optionalDependencies` as well, at every depth.
    /// Default is `false`.
    pub include_optional_deps: bool,
    /// Use of cache defined external, it designed to share one
    /// resolution session between different hashers.
    ///
    /// - If `external_cache` is `None`, use default cache in hasher.
    /// - If `external_cache.is_some()` is true, use this cache.
    ///
    /// Hashers sharing a cache should also share their other options.
    /// Default is `None`.
    pub external_cache: Option<Arc<CacheGroup>>,
}

impl Default for Options {
    fn default() -> Self {
        let description_file = String::from("package.json");
        let modules = String::from("node_modules");
        let include_optional_deps = false;
        let external_cache = None;
        Self {
            description_file,
            modules,
            include_optional_deps,
            external_cache,
        }
    }
}
