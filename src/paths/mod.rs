//! Pure path and token helpers shared by the pipeline stages.
//!
//! Separator normalisation, installed-root detection and hashing live in focused submodules so
//! each rule can be tested on its own.

mod hashing;
mod installed_root;
mod normalize;

pub use hashing::{content_hash, hash_path_for};
pub use installed_root::{installed_root_remainder, json_escape_backslashes, token_base};
pub use normalize::{normalize_separators, to_file_url, trim_trailing_separators};
