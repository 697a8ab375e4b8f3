//! Writing the small descriptor that sits next to a pack's build output.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::PostBuildWarning;
use crate::models::PackManifest;

/// Serialise `manifest` as `file_name` inside `output_dir`, returning the written path.
pub fn write_manifest(output_dir: &Path, file_name: &str, manifest: &PackManifest) -> Result<PathBuf> {
  fs::create_dir_all(output_dir)
    .with_context(|| format!("failed to create {}", output_dir.display()))?;

  let path = output_dir.join(file_name);
  let json = serde_json::to_string_pretty(manifest)?;
  fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
  Ok(path)
}

/// Write the manifest, downgrading any failure to a [`PostBuildWarning`].
pub fn emit_manifest(
  output_dir: &Path,
  file_name: &str,
  manifest: &PackManifest,
) -> Result<PathBuf, PostBuildWarning> {
  write_manifest(output_dir, file_name, manifest)
    .inspect(|path| tracing::info!(path = %path.display(), "wrote pack manifest"))
    .map_err(|err| {
      tracing::warn!(pack = %manifest.pack_name, "failed to write manifest: {err:#}");
      PostBuildWarning::ManifestWriteFailed {
        path: output_dir.join(file_name),
        message: format!("{err:#}"),
      }
    })
}

/// Load a manifest previously written by [`write_manifest`].
pub fn load_manifest(path: &Path) -> Result<PackManifest> {
  let content = fs::read_to_string(path)
    .with_context(|| format!("manifest not found at {}", path.display()))?;
  serde_json::from_str(&content).context("failed to parse pack manifest JSON")
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn manifest() -> PackManifest {
    PackManifest {
      pack_name: "Vanilla".into(),
      catalog_path: Some("{InstalledAssetsToken}\\Addr\\Vanilla\\catalog.json".into()),
      load_path: "{InstalledAssetsToken}\\Addr\\Vanilla".into(),
      bundle_directory: "/g/StreamingAssets/Addr/Vanilla".into(),
    }
  }

  #[test]
  fn writes_and_reloads_manifest() {
    let dir = tempdir().unwrap();
    let path = write_manifest(dir.path(), "Vanilla.manifest.json", &manifest()).unwrap();
    assert_eq!(path, dir.path().join("Vanilla.manifest.json"));
    assert_eq!(load_manifest(&path).unwrap(), manifest());
  }

  #[test]
  fn write_failures_become_warnings() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file").unwrap();

    let warning = emit_manifest(&blocker, "Vanilla.manifest.json", &manifest()).unwrap_err();
    assert!(matches!(warning, PostBuildWarning::ManifestWriteFailed { .. }));
  }
}
