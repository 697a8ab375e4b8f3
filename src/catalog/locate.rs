use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use walkdir::WalkDir;

use crate::project::PackLayout;

/// Recursively collect catalog files below `dir`, sorted by path.
///
/// A missing directory yields an empty list; only an invalid file pattern is an error.
pub fn find_catalogs(layout: &PackLayout, dir: &Path) -> Result<Vec<PathBuf>> {
  let pattern = Regex::new(&layout.catalog_file_pattern)
    .with_context(|| format!("invalid catalog pattern '{}'", layout.catalog_file_pattern))?;

  let mut catalogs: Vec<PathBuf> = WalkDir::new(dir)
    .into_iter()
    .filter_map(|entry| entry.ok())
    .filter(|entry| entry.file_type().is_file())
    .filter(|entry| pattern.is_match(&entry.file_name().to_string_lossy()))
    .map(|entry| entry.into_path())
    .collect();
  catalogs.sort();
  Ok(catalogs)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::tempdir;

  #[test]
  fn finds_nested_catalogs_in_order() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("nested")).unwrap();
    fs::write(root.join("nested/catalog_b.json"), "{}").unwrap();
    fs::write(root.join("catalog_a.json"), "{}").unwrap();
    fs::write(root.join("catalog_a.hash"), "x").unwrap();
    fs::write(root.join("bundle.bundle"), "x").unwrap();

    let catalogs = find_catalogs(&PackLayout::default(), root).unwrap();
    assert_eq!(
      catalogs,
      vec![root.join("catalog_a.json"), root.join("nested/catalog_b.json")]
    );
  }

  #[test]
  fn missing_directory_yields_nothing() {
    let dir = tempdir().unwrap();
    let catalogs = find_catalogs(&PackLayout::default(), &dir.path().join("absent")).unwrap();
    assert!(catalogs.is_empty());
  }

  #[test]
  fn invalid_pattern_is_reported() {
    let layout = PackLayout {
      catalog_file_pattern: "catalog(".into(),
      ..PackLayout::default()
    };
    let dir = tempdir().unwrap();
    assert!(find_catalogs(&layout, dir.path()).is_err());
  }
}
