//! Pipeline configuration loader and per-build options.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::project::PackLayout;

const DEFAULT_CONFIG_FILE: &str = "content_pack.config.json";

/// Discoverable configuration describing tokens, file names and variable naming.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Directory name of the installed-assets root (paths below it get tokenised).
  pub installed_assets_marker: String,
  /// Token substituted for the installed-assets root in rewritten catalogs.
  pub installed_assets_token: String,
  /// Regular expression matched against file names when locating catalogs.
  pub catalog_file_pattern: String,
  /// Extension of the hash file written next to each catalog.
  pub hash_extension: String,
  /// Suffix appended to the pack name to form the default manifest file name.
  pub manifest_suffix: String,
  /// Template for the pack-scoped build path variable, `{name}` is the pack name.
  pub build_path_variable_template: String,
  /// Template for the pack-scoped load path variable, `{name}` is the pack name.
  pub load_path_variable_template: String,
  /// Output root used when a build does not override it.
  pub default_output_root: String,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      installed_assets_marker: "StreamingAssets".into(),
      installed_assets_token: "{InstalledAssetsToken}".into(),
      catalog_file_pattern: r"^catalog.*\.json$".into(),
      hash_extension: "hash".into(),
      manifest_suffix: ".manifest.json".into(),
      build_path_variable_template: "Pack_{name}_BuildPath".into(),
      load_path_variable_template: "Pack_{name}_LoadPath".into(),
      default_output_root: String::new(),
    }
  }
}

impl PipelineConfig {
  /// Attempt to load configuration from the provided directory.
  ///
  /// A missing or unparsable file falls back to the defaults so callers can always proceed.
  pub fn discover(dir: &Path) -> Self {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    match Self::from_path(&candidate) {
      Ok(config) => config,
      Err(err) => {
        if candidate.exists() {
          tracing::warn!(path = %candidate.display(), "ignoring pipeline config: {err:#}");
        }
        Self::default()
      }
    }
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> Result<Self> {
    let content =
      fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
  }

  /// Convert the configuration into an owned layout description.
  pub fn into_layout(self) -> PackLayout {
    PackLayout {
      installed_assets_marker: self.installed_assets_marker,
      installed_assets_token: self.installed_assets_token,
      catalog_file_pattern: self.catalog_file_pattern,
      hash_extension: self.hash_extension,
      manifest_suffix: self.manifest_suffix,
      build_path_variable_template: self.build_path_variable_template,
      load_path_variable_template: self.load_path_variable_template,
      default_output_root: self.default_output_root,
    }
  }
}

/// Options recognised by a single pack build.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildOptions {
  /// Profile whose variables are mutated; the active profile when absent.
  pub profile_id: Option<String>,
  /// Force the global remote-catalog flag on for the duration of the build.
  pub enable_remote_catalog: bool,
  /// Exclude every group outside the pack from the build.
  pub disable_other_groups: bool,
  /// Emit the manifest descriptor next to the build output.
  pub write_manifest_json: bool,
  /// Manifest file name, `<pack><manifest_suffix>` when absent.
  pub manifest_file_name: Option<String>,
  /// Set the global player version override to the pack name for the duration of the build.
  pub set_player_version_override: bool,
  /// Authoritative output root; the pack folder is created beneath it.
  pub output_root_override: Option<PathBuf>,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      profile_id: None,
      enable_remote_catalog: false,
      disable_other_groups: false,
      write_manifest_json: true,
      manifest_file_name: None,
      set_player_version_override: false,
      output_root_override: None,
    }
  }
}

impl BuildOptions {
  /// Read options from a JSON file.
  pub fn from_path(path: &Path) -> Result<Self> {
    let content =
      fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
  }
}
