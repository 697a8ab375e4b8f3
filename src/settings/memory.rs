use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{Group, PathBindings};
use crate::settings::{GlobalSettings, GroupRegistry, ProfileStore};

/// Profile variable declaration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProfileVariable {
  /// Stable id referenced by group bindings.
  pub id: String,
  /// Human readable name used for lookups.
  pub name: String,
}

/// In-memory settings store persisted as JSON.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct MemorySettings {
  /// Profile selected when a build does not name one.
  pub active_profile_id: Option<String>,
  /// Values per profile id, keyed by variable id.
  pub profiles: BTreeMap<String, BTreeMap<String, String>>,
  /// Declared variables.
  pub variables: Vec<ProfileVariable>,
  /// Registered groups.
  pub groups: Vec<Group>,
  /// Remote catalog build/load variables.
  pub catalog_bindings: PathBindings,
  /// Whether a remote catalog is produced.
  pub build_remote_catalog: bool,
  /// Player version override string.
  pub player_version_override: String,
  #[serde(skip)]
  modified_groups: BTreeSet<String>,
}

impl MemorySettings {
  /// Store with a single active profile.
  pub fn with_profile(profile_id: impl Into<String>) -> Self {
    let profile_id = profile_id.into();
    let mut settings = Self::default();
    settings.profiles.insert(profile_id.clone(), BTreeMap::new());
    settings.active_profile_id = Some(profile_id);
    settings
  }

  /// Load settings from a JSON file.
  pub fn load(path: &Path) -> Result<Self> {
    let content =
      fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
  }

  /// Persist settings as prettified JSON.
  pub fn save(&self, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(self)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
  }

  /// Register a group, replacing any group with the same name.
  pub fn insert_group(&mut self, group: Group) {
    match self.groups.iter_mut().find(|existing| existing.name == group.name) {
      Some(existing) => *existing = group,
      None => self.groups.push(group),
    }
  }

  /// Groups flagged as modified since the last call.
  pub fn take_modified_groups(&mut self) -> BTreeSet<String> {
    std::mem::take(&mut self.modified_groups)
  }

  /// Groups flagged as modified.
  pub fn modified_groups(&self) -> &BTreeSet<String> {
    &self.modified_groups
  }

  fn group_entry_mut(&mut self, name: &str) -> Result<&mut Group, StoreError> {
    self
      .groups
      .iter_mut()
      .find(|group| group.name == name)
      .ok_or_else(|| StoreError::UnknownGroup(name.to_string()))
  }

  fn next_variable_id(&self) -> String {
    let mut counter = self.variables.len() + 1;
    loop {
      let candidate = format!("var-{counter}");
      if !self.variables.iter().any(|variable| variable.id == candidate) {
        return candidate;
      }
      counter += 1;
    }
  }
}

impl ProfileStore for MemorySettings {
  fn active_profile_id(&self) -> Option<String> {
    self.active_profile_id.clone()
  }

  fn has_profile(&self, profile_id: &str) -> bool {
    self.profiles.contains_key(profile_id)
  }

  fn variable_id(&self, name: &str) -> Option<String> {
    self
      .variables
      .iter()
      .find(|variable| variable.name == name)
      .map(|variable| variable.id.clone())
  }

  fn create_variable(&mut self, name: &str, default_value: &str) -> Result<String, StoreError> {
    if name.trim().is_empty() {
      return Err(StoreError::Rejected("variable names must not be empty".into()));
    }
    if let Some(id) = self.variable_id(name) {
      return Ok(id);
    }

    let id = self.next_variable_id();
    self.variables.push(ProfileVariable {
      id: id.clone(),
      name: name.to_string(),
    });
    for values in self.profiles.values_mut() {
      values.insert(id.clone(), default_value.to_string());
    }
    Ok(id)
  }

  fn value(&self, profile_id: &str, name: &str) -> Option<String> {
    let id = self.variable_id(name)?;
    self.profiles.get(profile_id)?.get(&id).cloned()
  }

  fn set_value(&mut self, profile_id: &str, name: &str, value: &str) -> Result<(), StoreError> {
    let id = self
      .variable_id(name)
      .ok_or_else(|| StoreError::UnknownVariable(name.to_string()))?;
    let values = self
      .profiles
      .get_mut(profile_id)
      .ok_or_else(|| StoreError::UnknownProfile(profile_id.to_string()))?;
    values.insert(id, value.to_string());
    Ok(())
  }
}

impl GroupRegistry for MemorySettings {
  fn group_names(&self) -> Vec<String> {
    self.groups.iter().map(|group| group.name.clone()).collect()
  }

  fn group(&self, name: &str) -> Option<&Group> {
    self.groups.iter().find(|group| group.name == name)
  }

  fn set_path_bindings(&mut self, group: &str, bindings: PathBindings) -> Result<(), StoreError> {
    let entry = self.group_entry_mut(group)?;
    let schema = entry
      .schema
      .as_mut()
      .ok_or_else(|| StoreError::MissingSchema(group.to_string()))?;
    schema.paths = bindings;
    Ok(())
  }

  fn set_include_in_build(&mut self, group: &str, include: bool) -> Result<(), StoreError> {
    let entry = self.group_entry_mut(group)?;
    let schema = entry
      .schema
      .as_mut()
      .ok_or_else(|| StoreError::MissingSchema(group.to_string()))?;
    schema.include_in_build = include;
    Ok(())
  }

  fn set_entry_address(
    &mut self,
    group: &str,
    guid: &str,
    address: &str,
  ) -> Result<(), StoreError> {
    let entry = self
      .group_entry_mut(group)?
      .entries
      .iter_mut()
      .find(|entry| entry.guid == guid)
      .ok_or_else(|| StoreError::UnknownEntry {
        group: group.to_string(),
        entry: guid.to_string(),
      })?;
    entry.address = address.to_string();
    Ok(())
  }

  fn mark_modified(&mut self, group: &str) {
    self.modified_groups.insert(group.to_string());
  }
}

impl GlobalSettings for MemorySettings {
  fn catalog_bindings(&self) -> PathBindings {
    self.catalog_bindings.clone()
  }

  fn set_catalog_bindings(&mut self, bindings: PathBindings) -> Result<(), StoreError> {
    self.catalog_bindings = bindings;
    Ok(())
  }

  fn remote_catalog_enabled(&self) -> bool {
    self.build_remote_catalog
  }

  fn set_remote_catalog_enabled(&mut self, enabled: bool) -> Result<(), StoreError> {
    self.build_remote_catalog = enabled;
    Ok(())
  }

  fn player_version_override(&self) -> String {
    self.player_version_override.clone()
  }

  fn set_player_version_override(&mut self, value: &str) -> Result<(), StoreError> {
    self.player_version_override = value.to_string();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::Entry;
  use tempfile::tempdir;

  #[test]
  fn create_variable_is_idempotent_and_seeds_profiles() {
    let mut settings = MemorySettings::with_profile("default");
    settings.profiles.insert("release".into(), BTreeMap::new());

    let id = settings.create_variable("Remote.BuildPath", "/out").unwrap();
    assert_eq!(settings.create_variable("Remote.BuildPath", "/other").unwrap(), id);
    assert_eq!(settings.variables.len(), 1);
    assert_eq!(settings.value("default", "Remote.BuildPath").as_deref(), Some("/out"));
    assert_eq!(settings.value("release", "Remote.BuildPath").as_deref(), Some("/out"));
  }

  #[test]
  fn set_value_rejects_unknown_profile_and_variable() {
    let mut settings = MemorySettings::with_profile("default");
    assert_eq!(
      settings.set_value("default", "missing", "x"),
      Err(StoreError::UnknownVariable("missing".into()))
    );
    settings.create_variable("Local.BuildPath", "").unwrap();
    assert_eq!(
      settings.set_value("nope", "Local.BuildPath", "x"),
      Err(StoreError::UnknownProfile("nope".into()))
    );
  }

  #[test]
  fn variable_ids_skip_taken_values() {
    let mut settings = MemorySettings::with_profile("default");
    settings.variables.push(ProfileVariable {
      id: "var-2".into(),
      name: "Existing".into(),
    });
    let id = settings.create_variable("Fresh", "").unwrap();
    assert_eq!(id, "var-3");
  }

  #[test]
  fn group_mutations_require_schema() {
    let mut settings = MemorySettings::with_profile("default");
    settings.insert_group(Group {
      name: "Raw".into(),
      ..Group::default()
    });
    assert_eq!(
      settings.set_include_in_build("Raw", false),
      Err(StoreError::MissingSchema("Raw".into()))
    );
    assert_eq!(
      settings.set_include_in_build("Missing", false),
      Err(StoreError::UnknownGroup("Missing".into()))
    );
  }

  #[test]
  fn round_trips_through_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let mut settings = MemorySettings::with_profile("default");
    let build = settings.create_variable("Local.BuildPath", "/b").unwrap();
    let load = settings.create_variable("Local.LoadPath", "/l").unwrap();
    let mut group = Group::bundled("Vanilla", PathBindings::new(build, load));
    group.entries.push(Entry::new("g1", "Assets/Hat.prefab", "Hat"));
    settings.insert_group(group);
    settings.mark_modified("Vanilla");
    settings.save(&path).unwrap();

    let mut loaded = MemorySettings::load(&path).unwrap();
    assert!(loaded.modified_groups().is_empty());
    settings.take_modified_groups();
    assert_eq!(loaded, settings);
    loaded.set_entry_address("Vanilla", "g1", "Cap").unwrap();
    assert_eq!(loaded.groups[0].entries[0].address, "Cap");
  }
}
