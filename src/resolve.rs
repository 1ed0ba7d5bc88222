use std::fs::{self, FileType};
use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;

use crate::{kind::PathKind, DepHasher, Error, RResult};

#[cfg(unix)]
fn is_file_like(file_type: &FileType) -> bool {
    use std::os::unix::fs::FileTypeExt;
    file_type.is_file() || file_type.is_fifo()
}

#[cfg(not(unix))]
fn is_file_like(file_type: &FileType) -> bool {
    file_type.is_file()
}

impl DepHasher {
    /// Resolves `name` to the real path of its manifest file, searching the
    /// modules directories of `dir` and its ancestors. `dir` defaults to the
    /// current working directory.
    ///
    /// Returns `Ok(None)` when the package does not exist; a bad `name` or `dir`
    /// is an error.
    #[tracing::instrument(skip(self))]
    pub fn resolve_package_path(&self, name: &str, dir: Option<&Path>) -> RResult<Option<PathBuf>> {
        if name.is_empty() {
            return Err(Error::InvalidName(name.to_string()));
        }
        let start = self.start_dir(dir)?;
        self.resolve_from(name, &start)
    }

    /// Same as `resolve_package_path` for a `start` that is already a real directory.
    pub(crate) fn resolve_from(&self, name: &str, start: &Path) -> RResult<Option<PathBuf>> {
        match Self::get_target_kind(name) {
            PathKind::Relative | PathKind::Absolute => {
                let target = Path::new(name).absolutize_from(start)?;
                self.real_file_path(&target.join(&self.options.description_file))
            }
            PathKind::Normal => self.find_package_path(name, start),
        }
    }

    /// The real form of `dir`, which has to be an existing directory.
    pub(crate) fn start_dir(&self, dir: Option<&Path>) -> RResult<PathBuf> {
        let absolute = match dir {
            Some(dir) => dir.absolutize()?.to_path_buf(),
            None => std::env::current_dir()?,
        };
        self.real_directory_path(&absolute)?
            .ok_or_else(|| Error::InvalidDirectory(absolute.into()))
    }

    fn is_modules_dir(&self, dir: &Path) -> bool {
        // NODE_MODULES shows up on case-insensitive filesystems.
        dir.file_name().map_or(false, |name| {
            name.to_string_lossy()
                .eq_ignore_ascii_case(&self.options.modules)
        })
    }

    fn find_package_path(&self, name: &str, start: &Path) -> RResult<Option<PathBuf>> {
        let mut current = Some(start);
        while let Some(dir) = current {
            let Some(parent) = dir.parent() else {
                // filesystem root
                break;
            };
            let in_modules = self.is_modules_dir(dir);
            let candidate = if in_modules {
                dir.join(name)
            } else {
                dir.join(&self.options.modules).join(name)
            }
            .join(&self.options.description_file);

            if let Some(real) = self.real_file_path(&candidate)? {
                tracing::debug!("found '{}' at {}", name, real.display());
                return Ok(Some(real));
            }
            // Skip the parent of a modules directory, it would probe the same
            // modules directory again.
            current = if in_modules { parent.parent() } else { Some(parent) };
        }
        tracing::debug!("'{}' not found from {}", name, start.display());
        Ok(None)
    }

    /// Real path of `path` if it is a file (or fifo), `None` if it is missing
    /// or something else. Both outcomes are cached.
    pub(crate) fn real_file_path(&self, path: &Path) -> RResult<Option<PathBuf>> {
        let key = path.to_path_buf();
        if let Some(cached) = self.caches.real_file_path.get(&key) {
            return Ok(cached);
        }
        let real = match fs::metadata(path) {
            Ok(meta) if is_file_like(&meta.file_type()) => Some(dunce::canonicalize(path)?),
            Ok(_) => None,
            Err(error) if Error::is_not_found(&error) => None,
            Err(error) => return Err(error.into()),
        };
        Ok(self.caches.real_file_path.set(key, real))
    }

    /// Real path of `path` if it is a directory, `None` otherwise. Both outcomes are cached.
    pub(crate) fn real_directory_path(&self, path: &Path) -> RResult<Option<PathBuf>> {
        let key = path.to_path_buf();
        if let Some(cached) = self.caches.real_directory_path.get(&key) {
            return Ok(cached);
        }
        let real = match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Some(dunce::canonicalize(path)?),
            Ok(_) => None,
            Err(error) if Error::is_not_found(&error) => None,
            Err(error) => return Err(error.into()),
        };
        Ok(self.caches.real_directory_path.set(key, real))
    }
}
