//! # nodejs_dep_hash
//!
//! A stable hash of a package and everything it depends on, found through
//! `node_modules` directories. Use it as a cache key: if the hash is the
//! same, nothing under the package or its dependencies changed (as far as
//! file size, mode and mtime can tell).
//!
//! ## How to use?
//!
//! ```rust,no_run
//! // |-- node_modules
//! // |---- foo
//! // |------ package.json   { "dependencies": { "bar": "1.0.0" } }
//! // |------ node_modules
//! // |-------- bar
//! // |---------- package.json
//!
//! use nodejs_dep_hash::{DepHasher, Options};
//!
//! let cwd = std::env::current_dir().unwrap();
//! let hasher = DepHasher::new(Options::default());
//!
//! let set = hasher.discover_dependencies("foo", Some(cwd.as_path())).unwrap();
//! // -> [foo, bar]
//!
//! let hash = hasher.hash_for_dep("foo", Some(cwd.as_path()), None).unwrap();
//! // -> "3f1c…", the same until a file under foo or bar changes
//! ```
//!

mod cache;
mod description;
mod digest;
mod entry;
mod error;
mod fingerprint;
mod graph;
mod kind;
pub mod log;
mod options;
mod resolve;

pub use cache::{CacheGroup, CacheSizes, PathCache};
pub use description::{DedupKey, PackageDescriptor};
pub use digest::content_hash;
pub use entry::{ModuleEntry, ModuleKey};
pub use error::*;
pub use fingerprint::{FileSignature, Fingerprint, TreeFingerprint};
pub use graph::DependencySet;
pub use kind::PathKind;
pub use options::Options;

use once_cell::sync::Lazy;
use std::{fmt, path::Path, sync::Arc};

pub type RResult<T> = Result<T, Error>;

pub struct DepHasher {
    pub options: Options,
    pub(crate) caches: Arc<CacheGroup>,
    pub(crate) fingerprint: Arc<dyn Fingerprint>,
}

impl fmt::Debug for DepHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepHasher")
            .field("options", &self.options)
            .field("caches", &self.caches.sizes())
            .finish_non_exhaustive()
    }
}

impl DepHasher {
    pub fn new(options: Options) -> Self {
        log::enable_by_env();

        let caches = if let Some(external_cache) = options.external_cache.as_ref() {
            external_cache.clone()
        } else {
            Arc::new(CacheGroup::default())
        };
        let fingerprint: Arc<dyn Fingerprint> = Arc::new(TreeFingerprint::new(options.modules.clone()));
        Self {
            options,
            caches,
            fingerprint,
        }
    }

    /// Same options, fresh private caches.
    pub(crate) fn isolated(&self) -> Self {
        Self::new(Options {
            external_cache: None,
            ..self.options.clone()
        })
    }

    pub fn caches(&self) -> &Arc<CacheGroup> {
        &self.caches
    }

    pub fn reset_cache(&self) {
        self.caches.reset();
    }

    pub fn cache_sizes(&self) -> CacheSizes {
        self.caches.sizes()
    }

    /// Hash of `name`, resolved from `dir`, and all its transitive dependencies.
    ///
    /// With `fingerprint` unset, every package is fingerprinted with
    /// [`TreeFingerprint`] and results are memoized in this hasher's caches.
    /// A `fingerprint` replaces it and skips the caches entirely.
    ///
    /// A package that does not exist still hashes, from `name` and `dir` alone.
    #[tracing::instrument(skip(self, fingerprint), fields(paths = tracing::field::Empty))]
    pub fn hash_for_dep(
        &self,
        name: &str,
        dir: Option<&Path>,
        fingerprint: Option<&dyn Fingerprint>,
    ) -> RResult<String> {
        match fingerprint {
            None => {
                let entry = self.locate(name, dir, None)?;
                entry.get_hash()
            }
            Some(fingerprint) => self.isolated().hash_uncached(name, dir, fingerprint),
        }
    }

    fn hash_uncached(
        &self,
        name: &str,
        dir: Option<&Path>,
        fingerprint: &dyn Fingerprint,
    ) -> RResult<String> {
        let set = self.discover_dependencies(name, dir)?;
        if set.is_empty() {
            let start = self.start_dir(dir)?;
            return Ok(digest::missing_hash(name, &start));
        }
        let base_dirs = set.base_dirs();
        tracing::Span::current().record("paths", base_dirs.len() as u64);
        let hashes = base_dirs
            .into_iter()
            .map(|base_dir| fingerprint.fingerprint(base_dir))
            .collect::<RResult<Vec<_>>>()?;
        Ok(digest::join_hashes(&hashes))
    }
}

static DEFAULT_HASHER: Lazy<DepHasher> = Lazy::new(|| DepHasher::new(Options::default()));

/// [`DepHasher::hash_for_dep`] on the process-wide hasher.
pub fn compute_dependency_hash(
    name: &str,
    dir: Option<&Path>,
    fingerprint: Option<&dyn Fingerprint>,
) -> RResult<String> {
    DEFAULT_HASHER.hash_for_dep(name, dir, fingerprint)
}

/// Clears the process-wide caches. Nothing else ever does.
pub fn reset_cache() {
    DEFAULT_HASHER.reset_cache();
}

pub fn cache_sizes() -> CacheSizes {
    DEFAULT_HASHER.cache_sizes()
}
