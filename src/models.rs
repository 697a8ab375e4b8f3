//! Value types describing packs, groups and the artifacts produced for them.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Named selection of groups packaged into its own output folder.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentPack {
  /// Pack name, also the default output folder and group-selection key.
  pub name: String,
  /// Groups referenced by the pack. Empty means "the group named like the pack".
  pub groups: Vec<String>,
  /// Output folder below the output root, the pack name when absent.
  pub output_subfolder: Option<String>,
  /// Runtime load root recorded in the manifest instead of the tokenised path.
  pub remote_load_root: Option<String>,
}

impl ContentPack {
  /// Pack with no explicit groups or overrides.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  /// Pack selecting the given groups.
  pub fn with_groups<I, S>(name: impl Into<String>, groups: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      name: name.into(),
      groups: groups.into_iter().map(Into::into).collect(),
      ..Self::default()
    }
  }

  /// Group names in scope for a build, falling back to the pack name.
  pub fn group_names(&self) -> Vec<String> {
    let names: Vec<String> = self
      .groups
      .iter()
      .map(|name| name.trim().to_string())
      .filter(|name| !name.is_empty())
      .collect();
    if names.is_empty() {
      vec![self.name.clone()]
    } else {
      names
    }
  }

  /// Folder name the pack is written to.
  pub fn output_folder_name(&self) -> &str {
    self
      .output_subfolder
      .as_deref()
      .map(str::trim)
      .filter(|value| !value.is_empty())
      .unwrap_or(&self.name)
  }
}

/// Variable ids a group (or the global catalog settings) reads its paths from.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct PathBindings {
  /// Variable id bound as the build (write-time) path.
  pub build_variable: Option<String>,
  /// Variable id bound as the load (read-time) path.
  pub load_variable: Option<String>,
}

impl PathBindings {
  /// Bindings pointing at the two given variable ids.
  pub fn new(build_variable: impl Into<String>, load_variable: impl Into<String>) -> Self {
    Self {
      build_variable: Some(build_variable.into()),
      load_variable: Some(load_variable.into()),
    }
  }
}

/// Bundled packing schema attached to a group; only groups carrying one can be built.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct BundleSchema {
  /// Build/load path variables of the group.
  pub paths: PathBindings,
  /// Whether the group takes part in builds.
  pub include_in_build: bool,
}

/// One packaged item.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Entry {
  /// Stable content-addressed identifier.
  pub guid: String,
  /// Source file path, absent when it cannot be resolved.
  pub asset_path: Option<String>,
  /// Public address used to load the entry.
  pub address: String,
  /// Folder entries group other entries and are never renamed.
  pub is_folder: bool,
}

impl Entry {
  /// Entry backed by the given file.
  pub fn new(guid: impl Into<String>, asset_path: impl Into<String>, address: impl Into<String>) -> Self {
    Self {
      guid: guid.into(),
      asset_path: Some(asset_path.into()),
      address: address.into(),
      is_folder: false,
    }
  }

  /// Base name of the backing file without directory or extension.
  pub fn file_stem(&self) -> Option<String> {
    let path = self.asset_path.as_deref()?.trim();
    if path.is_empty() {
      return None;
    }
    let normalized = path.replace('\\', "/");
    let stem = Path::new(&normalized).file_stem()?.to_string_lossy().to_string();
    (!stem.is_empty()).then_some(stem)
  }
}

/// Named collection of entries sharing build/load path configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Group {
  /// Group name.
  pub name: String,
  /// Entries owned by the group.
  pub entries: Vec<Entry>,
  /// Bundled schema, absent for groups that cannot be packaged.
  pub schema: Option<BundleSchema>,
}

impl Group {
  /// Group with a bundled schema that is included in builds.
  pub fn bundled(name: impl Into<String>, paths: PathBindings) -> Self {
    Self {
      name: name.into(),
      entries: Vec::new(),
      schema: Some(BundleSchema {
        paths,
        include_in_build: true,
      }),
    }
  }

  /// Whether the group carries the bundled schema.
  pub fn has_schema(&self) -> bool {
    self.schema.is_some()
  }

  /// Current path bindings, default when the group has no schema.
  pub fn path_bindings(&self) -> PathBindings {
    self
      .schema
      .as_ref()
      .map(|schema| schema.paths.clone())
      .unwrap_or_default()
  }

  /// Include-in-build flag, `false` for groups without a schema.
  pub fn include_in_build(&self) -> bool {
    self
      .schema
      .as_ref()
      .is_some_and(|schema| schema.include_in_build)
  }
}

/// Descriptor written next to a pack's build output.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackManifest {
  /// Pack name.
  pub pack_name: String,
  /// Catalog path as seen at runtime, absent when no catalog was produced.
  pub catalog_path: Option<String>,
  /// Expression the runtime loads bundles from.
  pub load_path: String,
  /// Physical folder holding the bundles.
  pub bundle_directory: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn group_names_default_to_pack_name() {
    assert_eq!(ContentPack::new("Vanilla").group_names(), vec!["Vanilla"]);
    assert_eq!(
      ContentPack::with_groups("Vanilla", [" ", "Vanilla", "Extras"]).group_names(),
      vec!["Vanilla", "Extras"]
    );
  }

  #[test]
  fn blank_subfolder_falls_back_to_name() {
    let mut pack = ContentPack::new("Vanilla");
    pack.output_subfolder = Some("  ".into());
    assert_eq!(pack.output_folder_name(), "Vanilla");
  }

  #[test]
  fn file_stem_strips_directories_and_extension() {
    let entry = Entry::new("g1", "Assets\\Packs\\Vanilla\\Hat.prefab", "Assets/Packs/Vanilla/Hat.prefab");
    assert_eq!(entry.file_stem().as_deref(), Some("Hat"));

    let unresolved = Entry {
      guid: "g2".into(),
      asset_path: Some(String::new()),
      ..Entry::default()
    };
    assert_eq!(unresolved.file_stem(), None);
  }

  #[test]
  fn manifest_serialises_camel_case() {
    let manifest = PackManifest {
      pack_name: "Vanilla".into(),
      catalog_path: None,
      load_path: "file:///g/out/Vanilla".into(),
      bundle_directory: "/g/out/Vanilla".into(),
    };
    let json = serde_json::to_string(&manifest).unwrap();
    assert!(json.contains("\"packName\":\"Vanilla\""));
    assert!(json.contains("\"bundleDirectory\""));
  }
}
