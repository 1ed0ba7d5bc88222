use std::{io, path::Path};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected json in '{}': {}", .0.display(), .1)]
    UnexpectedJson(Box<Path>, serde_json::Error),
    #[error("invalid package name '{0}', it must be a non-empty string")]
    InvalidName(String),
    #[error("'{}' must refer to an existing directory", .0.display())]
    InvalidDirectory(Box<Path>),
    #[error("'{}': unexpected file type", .0.display())]
    UnsupportedFileType(Box<Path>),
    /// A dependency of the entry at this path was evicted from the cache
    /// group before the entry's hash was computed.
    #[error("a dependency of '{}' was evicted before its hash was computed", .0.display())]
    StaleEntry(Box<Path>),
    #[error("module entry for '{}' was hashed before its dependencies were known", .0.display())]
    UnbuiltEntry(Box<Path>),
}

impl Error {
    /// `true` for the io errors treated as a soft miss while probing.
    pub(crate) fn is_not_found(error: &io::Error) -> bool {
        matches!(
            error.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
        )
    }
}
