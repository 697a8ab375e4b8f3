//! Resolved layout shared by every pipeline stage.

use std::path::{Path, PathBuf};

use crate::models::ContentPack;

/// Owned description of names, tokens and file conventions used by a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackLayout {
  /// Directory name of the installed-assets root.
  pub installed_assets_marker: String,
  /// Token substituted for the installed-assets root.
  pub installed_assets_token: String,
  /// File name pattern identifying catalogs.
  pub catalog_file_pattern: String,
  /// Extension of catalog hash files.
  pub hash_extension: String,
  /// Suffix of the default manifest file name.
  pub manifest_suffix: String,
  /// Template of the pack-scoped build path variable name.
  pub build_path_variable_template: String,
  /// Template of the pack-scoped load path variable name.
  pub load_path_variable_template: String,
  /// Output root used when a build does not override it.
  pub default_output_root: String,
}

impl Default for PackLayout {
  fn default() -> Self {
    crate::config::PipelineConfig::default().into_layout()
  }
}

impl PackLayout {
  /// Name of the pack-scoped build path variable.
  pub fn build_path_variable(&self, pack_name: &str) -> String {
    self.build_path_variable_template.replace("{name}", pack_name)
  }

  /// Name of the pack-scoped load path variable.
  pub fn load_path_variable(&self, pack_name: &str) -> String {
    self.load_path_variable_template.replace("{name}", pack_name)
  }

  /// Default manifest file name for a pack.
  pub fn manifest_file_name(&self, pack_name: &str) -> String {
    format!("{pack_name}{}", self.manifest_suffix)
  }

  /// Physical folder a pack is built into below `output_root`.
  pub fn pack_output_dir(&self, output_root: &Path, pack: &ContentPack) -> PathBuf {
    output_root.join(pack.output_folder_name())
  }
}
