//! Post-build catalog handling: locating catalogs and rewriting them into relocatable tokens.

mod locate;
mod rewrite;

pub use locate::find_catalogs;
pub use rewrite::{CatalogRewriter, RewriteSummary};
