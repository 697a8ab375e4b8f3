use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Stable content hash of arbitrary bytes, rendered as lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Sibling hash file for a catalog: same base name, `extension` swapped in.
pub fn hash_path_for(catalog: &Path, extension: &str) -> PathBuf {
    catalog.with_extension(extension.trim_start_matches('.'))
}
