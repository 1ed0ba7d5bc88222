use sha2::{Digest, Sha256};

/// Separator between the per-package fingerprints of a dependency set.
pub(crate) const JOIN_SEPARATOR: &str = "\0";

/// The content-hash primitive: SHA-256 as lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Final digest over the fingerprints of a dependency set, in set order.
pub(crate) fn join_hashes<S: AsRef<str>>(hashes: &[S]) -> String {
    let joined = hashes
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(JOIN_SEPARATOR);
    content_hash(joined.as_bytes())
}

/// Digest of a package that does not exist, derived from the query alone.
pub(crate) fn missing_hash(name: &str, dir: &std::path::Path) -> String {
    let value = format!("{name}{JOIN_SEPARATOR}{}", dir.display());
    content_hash(value.as_bytes())
}
