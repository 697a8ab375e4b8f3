use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PostBuildWarning, RewriteError, error_chain};
use crate::paths::{
  content_hash, hash_path_for, installed_root_remainder, json_escape_backslashes,
  normalize_separators, token_base, trim_trailing_separators,
};
use crate::project::PackLayout;

/// Result of a successful catalog rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteSummary {
  /// Catalog that was rewritten.
  pub catalog: PathBuf,
  /// Hash file written next to it.
  pub hash_path: PathBuf,
  /// Number of physical prefixes replaced.
  pub replacements: usize,
  /// Hash of the catalog bytes now on disk.
  pub hash: String,
}

/// Rewrites physical build paths inside catalogs into installed-root tokens.
///
/// The catalog is never parsed: the physical prefix always appears as an escaped substring of a
/// JSON string, so plain text substitution is enough and keeps unrelated bytes untouched.
#[derive(Debug, Clone, Copy)]
pub struct CatalogRewriter<'a> {
  layout: &'a PackLayout,
}

impl<'a> CatalogRewriter<'a> {
  /// Rewriter using the layout's token, marker and hash extension.
  pub fn new(layout: &'a PackLayout) -> Self {
    Self { layout }
  }

  /// Token base for an output root, `None` when the root is outside the installed-assets root.
  pub fn token_base_for(&self, output_root: &Path) -> Option<String> {
    let root = normalize_separators(output_root);
    let remainder = installed_root_remainder(&root, &self.layout.installed_assets_marker)?;
    Some(token_base(&self.layout.installed_assets_token, &remainder))
  }

  /// Runtime replacement prefix for a pack folder, with single backslashes.
  pub fn replacement_prefix(token_base: &str, pack_folder: &str) -> String {
    format!("{token_base}\\{pack_folder}\\")
  }

  /// Replace every physical `physical_output_dir` prefix in `catalog` and refresh its hash.
  ///
  /// On failure the sibling hash file is removed before the error is returned: a missing hash
  /// forces re-verification, a hash that no longer matches the catalog goes unnoticed.
  pub fn rewrite(
    &self,
    catalog: &Path,
    physical_output_dir: &str,
    token_base: &str,
    pack_folder: &str,
  ) -> Result<RewriteSummary, RewriteError> {
    self
      .substitute_and_hash(catalog, physical_output_dir, token_base, pack_folder)
      .inspect_err(|_| {
        if let Err(message) = self.discard_hash(catalog) {
          tracing::warn!(catalog = %catalog.display(), "failed to remove stale hash: {message}");
        }
      })
  }

  /// Like [`CatalogRewriter::rewrite`], but failures come back as warnings.
  pub fn rewrite_or_discard_hash(
    &self,
    catalog: &Path,
    physical_output_dir: &str,
    token_base: &str,
    pack_folder: &str,
  ) -> (Option<RewriteSummary>, Vec<PostBuildWarning>) {
    match self.substitute_and_hash(catalog, physical_output_dir, token_base, pack_folder) {
      Ok(summary) => (Some(summary), Vec::new()),
      Err(err) => {
        let message = error_chain(&err);
        tracing::warn!(catalog = %catalog.display(), "catalog rewrite failed: {message}");
        let mut warnings = vec![PostBuildWarning::RewriteFailed {
          catalog: catalog.to_path_buf(),
          message,
        }];
        if let Err(message) = self.discard_hash(catalog) {
          let hash = hash_path_for(catalog, &self.layout.hash_extension);
          tracing::warn!(hash = %hash.display(), "failed to remove stale hash: {message}");
          warnings.push(PostBuildWarning::HashRemovalFailed { hash, message });
        }
        (None, warnings)
      }
    }
  }

  fn substitute_and_hash(
    &self,
    catalog: &Path,
    physical_output_dir: &str,
    token_base: &str,
    pack_folder: &str,
  ) -> Result<RewriteSummary, RewriteError> {
    let text = fs::read_to_string(catalog).map_err(|source| RewriteError::Read {
      path: catalog.to_path_buf(),
      source,
    })?;

    let replacement = json_escape_backslashes(&Self::replacement_prefix(token_base, pack_folder));
    let (rewritten, replacements) = substitute_prefixes(&text, physical_output_dir, &replacement);

    if replacements > 0 {
      fs::write(catalog, &rewritten).map_err(|source| RewriteError::Write {
        path: catalog.to_path_buf(),
        source,
      })?;
    }

    let hash = content_hash(rewritten.as_bytes());
    let hash_path = hash_path_for(catalog, &self.layout.hash_extension);
    fs::write(&hash_path, &hash).map_err(|source| RewriteError::Write {
      path: hash_path.clone(),
      source,
    })?;

    tracing::info!(
      catalog = %catalog.display(),
      replacements,
      "rewrote catalog paths to {token_base}"
    );

    Ok(RewriteSummary {
      catalog: catalog.to_path_buf(),
      hash_path,
      replacements,
      hash,
    })
  }

  fn discard_hash(&self, catalog: &Path) -> Result<(), String> {
    remove_if_present(&hash_path_for(catalog, &self.layout.hash_extension))
  }
}

/// Replace each spelling of `physical_output_dir` followed by a separator.
///
/// Escaped spellings go first so a JSON `\\` pair is consumed whole instead of leaving a dangling
/// backslash after the replacement.
fn substitute_prefixes(text: &str, physical_output_dir: &str, replacement: &str) -> (String, usize) {
  let dir = trim_trailing_separators(physical_output_dir);
  if dir.is_empty() {
    return (text.to_string(), 0);
  }

  let native = dir.replace('/', "\\");
  let candidates = [
    format!("{}\\\\", json_escape_backslashes(&native)),
    format!("{}\\\\", json_escape_backslashes(dir)),
    format!("{dir}/"),
    format!("{dir}\\"),
  ];

  let mut variants: Vec<&str> = Vec::new();
  for candidate in &candidates {
    if !variants.contains(&candidate.as_str()) {
      variants.push(candidate);
    }
  }

  let mut result = text.to_string();
  let mut replacements = 0;
  for variant in variants {
    let count = result.matches(variant).count();
    if count > 0 {
      result = result.replace(variant, replacement);
      replacements += count;
    }
  }
  (result, replacements)
}

fn remove_if_present(path: &Path) -> Result<(), String> {
  match fs::remove_file(path) {
    Ok(()) => Ok(()),
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
    Err(err) => Err(err.to_string()),
  }
}
