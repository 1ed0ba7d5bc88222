//! Stat-based digest of one package's own files.
//!
//! Only metadata is read: two trees with identical bytes but different
//! mtimes hash differently, and a content change that keeps size, mode and
//! mtime goes unnoticed.

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rustc_hash::FxHashSet;

use crate::digest::content_hash;
use crate::{Error, RResult};

const FIELD_SEPARATOR: char = '\0';
const RECORD_SEPARATOR: &str = "\u{1e}";

/// Produces the digest of the files under a package's base directory.
///
/// Plain closures work too, which is handy for stand-ins in tests.
pub trait Fingerprint: Send + Sync {
    fn fingerprint(&self, base_dir: &Path) -> RResult<String>;
}

impl<F> Fingerprint for F
where
    F: Fn(&Path) -> String + Send + Sync,
{
    fn fingerprint(&self, base_dir: &Path) -> RResult<String> {
        Ok(self(base_dir))
    }
}

/// Metadata snapshot of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSignature {
    pub path: PathBuf,
    /// ms since the epoch, negative before it
    pub mtime: i64,
    pub mode: u32,
    pub size: u64,
}

impl FileSignature {
    fn from_metadata(path: PathBuf, meta: &Metadata) -> Self {
        Self {
            path,
            mtime: meta.modified().ok().map_or(0, millis_since_epoch),
            mode: mode_of(meta),
            size: meta.len(),
        }
    }

    /// Stands in for a symlink whose target is gone.
    fn broken_link(path: PathBuf) -> Self {
        Self {
            path,
            mtime: 0,
            mode: 0,
            size: 0,
        }
    }

    /// `\0<path>\0<mtime>\0<mode>\0<size>`, with `path` made relative to `root`
    /// and `/`-separated so the record does not depend on where the tree lives.
    pub fn to_record(&self, root: &Path) -> String {
        let relative = self
            .path
            .strip_prefix(root)
            .unwrap_or(&self.path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let s = FIELD_SEPARATOR;
        format!(
            "{s}{relative}{s}{}{s}{}{s}{}",
            self.mtime, self.mode, self.size
        )
    }
}

fn millis_since_epoch(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_millis() as i64,
        Err(before) => -(before.duration().as_millis() as i64),
    }
}

#[cfg(unix)]
fn mode_of(meta: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode()
}

#[cfg(not(unix))]
fn mode_of(meta: &Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o100444
    } else {
        0o100666
    }
}

/// Links followed before a chain counts as a loop, the same bound Linux uses.
const MAX_LINK_HOPS: usize = 40;

/// Whether following the symlink at `path` comes back to a link already seen.
fn is_link_loop(path: &Path) -> bool {
    let mut seen = FxHashSet::default();
    let mut current = path.to_path_buf();
    while let Ok(target) = fs::read_link(&current) {
        let next = match current.parent() {
            Some(parent) => parent.join(target),
            None => target,
        };
        if !seen.insert(current) || seen.len() > MAX_LINK_HOPS {
            return true;
        }
        current = next;
    }
    false
}

/// The default fingerprint: every file under the base directory except the
/// nested modules directories, which belong to other packages.
#[derive(Debug, Clone)]
pub struct TreeFingerprint {
    modules: String,
}

impl Default for TreeFingerprint {
    fn default() -> Self {
        Self::new("node_modules")
    }
}

impl TreeFingerprint {
    pub fn new(modules: impl Into<String>) -> Self {
        Self {
            modules: modules.into(),
        }
    }

    /// Signatures of every file under `root` (or of `root` itself when it is
    /// a file), sorted by path.
    pub fn file_signatures(&self, root: &Path) -> RResult<Vec<FileSignature>> {
        let mut signatures = Vec::new();
        let mut ancestors = Vec::new();
        self.collect(root, &mut ancestors, &mut signatures)?;
        signatures.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(signatures)
    }

    /// `ancestors` holds the real paths of the directories on the current
    /// descent, so a symlink pointing back up is entered at most once.
    fn collect(
        &self,
        path: &Path,
        ancestors: &mut Vec<PathBuf>,
        out: &mut Vec<FileSignature>,
    ) -> RResult<()> {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(error) if error.kind() == io::ErrorKind::NotFound && path.is_symlink() => {
                tracing::debug!("broken symlink {}", path.display());
                out.push(FileSignature::broken_link(path.to_path_buf()));
                return Ok(());
            }
            Err(_) if path.is_symlink() && is_link_loop(path) => {
                tracing::debug!("symlink loop at {}", path.display());
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        };

        if meta.is_file() {
            out.push(FileSignature::from_metadata(path.to_path_buf(), &meta));
        } else if meta.is_dir() {
            let real = dunce::canonicalize(path)?;
            if ancestors.contains(&real) {
                tracing::debug!("symlink cycle at {}", path.display());
                return Ok(());
            }
            let mut names = fs::read_dir(path)?
                .map(|entry| entry.map(|entry| entry.file_name()))
                .collect::<io::Result<Vec<_>>>()?;
            names.sort();

            ancestors.push(real);
            for name in names {
                if name.to_string_lossy().eq_ignore_ascii_case(&self.modules) {
                    continue;
                }
                self.collect(&path.join(name), ancestors, out)?;
            }
            ancestors.pop();
        } else {
            return Err(Error::UnsupportedFileType(path.into()));
        }
        Ok(())
    }
}

impl Fingerprint for TreeFingerprint {
    fn fingerprint(&self, base_dir: &Path) -> RResult<String> {
        let records = self
            .file_signatures(base_dir)?
            .iter()
            .map(|signature| signature.to_record(base_dir))
            .collect::<Vec<_>>()
            .join(RECORD_SEPARATOR);
        Ok(content_hash(records.as_bytes()))
    }
}
