//! Temporary rebinding of path variables with guaranteed restoration.
//!
//! Every mutation made through [`VariableBindings`] first records an [`UndoAction`] holding the
//! previous state. [`VariableBindings::restore_all`] replays the log in reverse, treating each
//! action independently so one failing restore cannot block the others.

use std::fmt;

use crate::error::StoreError;
use crate::models::PathBindings;
use crate::settings::{BuildSettings, ProfileStore};

/// Previous state captured before one mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
  /// A group's build/load variable ids.
  GroupPaths {
    /// Group name.
    group: String,
    /// Bindings before the build.
    previous: PathBindings,
  },
  /// The global remote catalog build/load variable ids.
  CatalogPaths {
    /// Bindings before the build.
    previous: PathBindings,
  },
  /// A variable value in one profile.
  VariableValue {
    /// Profile id.
    profile_id: String,
    /// Variable name.
    name: String,
    /// Value before the build, `None` when it was unset.
    previous: Option<String>,
  },
  /// The global remote catalog flag.
  RemoteCatalogEnabled {
    /// Flag before the build.
    previous: bool,
  },
  /// The global player version override.
  PlayerVersionOverride {
    /// Override before the build.
    previous: String,
  },
  /// A group's include-in-build flag.
  IncludeInBuild {
    /// Group name.
    group: String,
    /// Flag before the build.
    previous: bool,
  },
}

impl fmt::Display for UndoAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::GroupPaths { group, .. } => write!(f, "path bindings of group '{group}'"),
      Self::CatalogPaths { .. } => f.write_str("remote catalog path bindings"),
      Self::VariableValue {
        profile_id, name, ..
      } => write!(f, "variable '{name}' in profile '{profile_id}'"),
      Self::RemoteCatalogEnabled { .. } => f.write_str("remote catalog flag"),
      Self::PlayerVersionOverride { .. } => f.write_str("player version override"),
      Self::IncludeInBuild { group, .. } => write!(f, "include-in-build flag of group '{group}'"),
    }
  }
}

/// A restore step that failed. Logged and collected, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreFailure {
  /// Description of the state that could not be restored.
  pub action: String,
  /// Store error message.
  pub message: String,
}

/// Ensure a profile variable exists, creating it with `default_value` when missing.
///
/// Always returns `name`. Creation failures are logged rather than returned because the store
/// may legitimately hold the variable already.
pub fn ensure_variable<S>(store: &mut S, name: &str, default_value: &str) -> String
where
  S: ProfileStore + ?Sized,
{
  if store.variable_id(name).is_none() {
    match store.create_variable(name, default_value) {
      Ok(id) => tracing::debug!(variable = name, id = %id, "created profile variable"),
      Err(err) => tracing::warn!(variable = name, "failed to create profile variable: {err}"),
    }
  }
  name.to_string()
}

/// Undo log for the bindings and values mutated during one build.
#[derive(Debug, Default)]
pub struct VariableBindings {
  undo: Vec<UndoAction>,
}

impl VariableBindings {
  /// Empty log.
  pub fn new() -> Self {
    Self::default()
  }

  /// Whether nothing is waiting to be restored.
  pub fn is_empty(&self) -> bool {
    self.undo.is_empty()
  }

  /// Rebind a group's build and load path variables to the named variables.
  pub fn bind_group_paths<S>(
    &mut self,
    store: &mut S,
    group: &str,
    build_variable: &str,
    load_variable: &str,
  ) -> Result<(), StoreError>
  where
    S: BuildSettings + ?Sized,
  {
    let bindings = resolve_bindings(store, build_variable, load_variable)?;
    let previous = store
      .group(group)
      .ok_or_else(|| StoreError::UnknownGroup(group.to_string()))?
      .path_bindings();
    self.undo.push(UndoAction::GroupPaths {
      group: group.to_string(),
      previous,
    });
    store.set_path_bindings(group, bindings)
  }

  /// Rebind the global remote catalog build and load variables.
  pub fn bind_catalog_paths<S>(
    &mut self,
    store: &mut S,
    build_variable: &str,
    load_variable: &str,
  ) -> Result<(), StoreError>
  where
    S: BuildSettings + ?Sized,
  {
    let bindings = resolve_bindings(store, build_variable, load_variable)?;
    self.undo.push(UndoAction::CatalogPaths {
      previous: store.catalog_bindings(),
    });
    store.set_catalog_bindings(bindings)
  }

  /// Snapshot the value of `name` in `profile_id`, then overwrite it.
  pub fn set_pack_scoped_value<S>(
    &mut self,
    store: &mut S,
    profile_id: &str,
    name: &str,
    value: &str,
  ) -> Result<(), StoreError>
  where
    S: BuildSettings + ?Sized,
  {
    self.undo.push(UndoAction::VariableValue {
      profile_id: profile_id.to_string(),
      name: name.to_string(),
      previous: store.value(profile_id, name),
    });
    store.set_value(profile_id, name, value)
  }

  /// Snapshot and overwrite the remote catalog flag.
  pub fn set_remote_catalog_enabled<S>(
    &mut self,
    store: &mut S,
    enabled: bool,
  ) -> Result<(), StoreError>
  where
    S: BuildSettings + ?Sized,
  {
    self.undo.push(UndoAction::RemoteCatalogEnabled {
      previous: store.remote_catalog_enabled(),
    });
    store.set_remote_catalog_enabled(enabled)
  }

  /// Snapshot and overwrite the player version override.
  pub fn set_player_version_override<S>(
    &mut self,
    store: &mut S,
    value: &str,
  ) -> Result<(), StoreError>
  where
    S: BuildSettings + ?Sized,
  {
    self.undo.push(UndoAction::PlayerVersionOverride {
      previous: store.player_version_override(),
    });
    store.set_player_version_override(value)
  }

  /// Snapshot and overwrite a group's include-in-build flag.
  pub fn set_include_in_build<S>(
    &mut self,
    store: &mut S,
    group: &str,
    include: bool,
  ) -> Result<(), StoreError>
  where
    S: BuildSettings + ?Sized,
  {
    let previous = store
      .group(group)
      .ok_or_else(|| StoreError::UnknownGroup(group.to_string()))?
      .include_in_build();
    self.undo.push(UndoAction::IncludeInBuild {
      group: group.to_string(),
      previous,
    });
    store.set_include_in_build(group, include)
  }

  /// Restore the most recent path bindings recorded for `group`.
  ///
  /// Returns `Ok(false)` when nothing was recorded for the group.
  pub fn restore_group<S>(&mut self, store: &mut S, group: &str) -> Result<bool, StoreError>
  where
    S: BuildSettings + ?Sized,
  {
    let position = self.undo.iter().rposition(
      |action| matches!(action, UndoAction::GroupPaths { group: recorded, .. } if recorded == group),
    );
    match position {
      Some(position) => {
        let action = self.undo.remove(position);
        apply(store, &action).map(|()| true)
      }
      None => Ok(false),
    }
  }

  /// Restore the most recent value recorded for `name` in `profile_id`.
  pub fn restore_value<S>(
    &mut self,
    store: &mut S,
    profile_id: &str,
    name: &str,
  ) -> Result<bool, StoreError>
  where
    S: BuildSettings + ?Sized,
  {
    let position = self.undo.iter().rposition(|action| {
      matches!(
        action,
        UndoAction::VariableValue { profile_id: recorded_profile, name: recorded_name, .. }
          if recorded_profile == profile_id && recorded_name == name
      )
    });
    match position {
      Some(position) => {
        let action = self.undo.remove(position);
        apply(store, &action).map(|()| true)
      }
      None => Ok(false),
    }
  }

  /// Replay every recorded action in reverse order, emptying the log.
  pub fn restore_all<S>(&mut self, store: &mut S) -> Vec<RestoreFailure>
  where
    S: BuildSettings + ?Sized,
  {
    let mut failures = Vec::new();
    while let Some(action) = self.undo.pop() {
      match apply(store, &action) {
        Ok(()) => tracing::debug!("restored {action}"),
        Err(err) => {
          tracing::error!("failed to restore {action}: {err}");
          failures.push(RestoreFailure {
            action: action.to_string(),
            message: err.to_string(),
          });
        }
      }
    }
    failures
  }
}

fn resolve_bindings<S>(
  store: &S,
  build_variable: &str,
  load_variable: &str,
) -> Result<PathBindings, StoreError>
where
  S: ProfileStore + ?Sized,
{
  let build = store
    .variable_id(build_variable)
    .ok_or_else(|| StoreError::UnknownVariable(build_variable.to_string()))?;
  let load = store
    .variable_id(load_variable)
    .ok_or_else(|| StoreError::UnknownVariable(load_variable.to_string()))?;
  Ok(PathBindings::new(build, load))
}

fn apply<S>(store: &mut S, action: &UndoAction) -> Result<(), StoreError>
where
  S: BuildSettings + ?Sized,
{
  match action {
    UndoAction::GroupPaths { group, previous } => {
      // Absent ids keep whatever is bound now instead of unbinding the group.
      let current = store
        .group(group)
        .ok_or_else(|| StoreError::UnknownGroup(group.clone()))?
        .path_bindings();
      let restored = PathBindings {
        build_variable: non_empty(&previous.build_variable).or(current.build_variable),
        load_variable: non_empty(&previous.load_variable).or(current.load_variable),
      };
      store.set_path_bindings(group, restored)
    }
    UndoAction::CatalogPaths { previous } => store.set_catalog_bindings(previous.clone()),
    UndoAction::VariableValue {
      profile_id,
      name,
      previous,
    } => store.set_value(profile_id, name, previous.as_deref().unwrap_or_default()),
    UndoAction::RemoteCatalogEnabled { previous } => store.set_remote_catalog_enabled(*previous),
    UndoAction::PlayerVersionOverride { previous } => store.set_player_version_override(previous),
    UndoAction::IncludeInBuild { group, previous } => store.set_include_in_build(group, *previous),
  }
}

fn non_empty(value: &Option<String>) -> Option<String> {
  value.as_ref().filter(|id| !id.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::Group;
  use crate::settings::{GlobalSettings, GroupRegistry, MemorySettings};
  use pretty_assertions::assert_eq;

  fn settings() -> MemorySettings {
    let mut settings = MemorySettings::with_profile("default");
    let build = settings.create_variable("Local.BuildPath", "/lib").unwrap();
    let load = settings.create_variable("Local.LoadPath", "/lib").unwrap();
    settings.create_variable("Pack_V_BuildPath", "/g/out/V").unwrap();
    settings.create_variable("Pack_V_LoadPath", "file:///g/out/V").unwrap();
    settings.insert_group(Group::bundled("V", PathBindings::new(build.clone(), load.clone())));
    settings.insert_group(Group::bundled("Other", PathBindings::default()));
    settings.catalog_bindings = PathBindings::new(build, load);
    settings.player_version_override = "1.0".into();
    settings
  }

  #[test]
  fn ensure_variable_creates_once_and_returns_name() {
    let mut settings = MemorySettings::with_profile("default");
    assert_eq!(ensure_variable(&mut settings, "X", "1"), "X");
    assert_eq!(ensure_variable(&mut settings, "X", "2"), "X");
    assert_eq!(settings.value("default", "X").as_deref(), Some("1"));
  }

  #[test]
  fn ensure_variable_swallows_creation_errors() {
    let mut settings = MemorySettings::with_profile("default");
    assert_eq!(ensure_variable(&mut settings, " ", "1"), " ");
    assert!(settings.variables.is_empty());
  }

  #[test]
  fn restore_all_returns_store_to_previous_state() {
    let mut settings = settings();
    let before = settings.clone();
    let mut bindings = VariableBindings::new();

    bindings
      .bind_group_paths(&mut settings, "V", "Pack_V_BuildPath", "Pack_V_LoadPath")
      .unwrap();
    bindings
      .bind_catalog_paths(&mut settings, "Pack_V_BuildPath", "Pack_V_LoadPath")
      .unwrap();
    bindings
      .set_pack_scoped_value(&mut settings, "default", "Pack_V_BuildPath", "/elsewhere")
      .unwrap();
    bindings.set_remote_catalog_enabled(&mut settings, true).unwrap();
    bindings.set_player_version_override(&mut settings, "V").unwrap();
    bindings.set_include_in_build(&mut settings, "Other", false).unwrap();
    assert_ne!(settings, before);

    let failures = bindings.restore_all(&mut settings);
    assert!(failures.is_empty());
    assert!(bindings.is_empty());
    assert_eq!(settings, before);
  }

  #[test]
  fn restore_group_keeps_binding_when_previous_id_is_absent() {
    let mut settings = settings();
    let mut bindings = VariableBindings::new();
    bindings
      .bind_group_paths(&mut settings, "Other", "Pack_V_BuildPath", "Pack_V_LoadPath")
      .unwrap();

    assert!(bindings.restore_group(&mut settings, "Other").unwrap());
    let restored = settings.group("Other").unwrap().path_bindings();
    assert_eq!(restored.build_variable.as_deref(), settings.variable_id("Pack_V_BuildPath").as_deref());
    assert!(!bindings.restore_group(&mut settings, "Other").unwrap());
  }

  #[test]
  fn restore_value_writes_empty_snapshot_verbatim() {
    let mut settings = settings();
    settings.set_value("default", "Pack_V_LoadPath", "").unwrap();
    let mut bindings = VariableBindings::new();
    bindings
      .set_pack_scoped_value(&mut settings, "default", "Pack_V_LoadPath", "file:///x")
      .unwrap();

    assert!(bindings.restore_value(&mut settings, "default", "Pack_V_LoadPath").unwrap());
    assert_eq!(settings.value("default", "Pack_V_LoadPath").as_deref(), Some(""));
  }

  #[test]
  fn binding_unknown_variables_records_nothing() {
    let mut settings = settings();
    let mut bindings = VariableBindings::new();
    let err = bindings
      .bind_group_paths(&mut settings, "V", "Missing", "Pack_V_LoadPath")
      .unwrap_err();
    assert_eq!(err, StoreError::UnknownVariable("Missing".into()));
    assert!(bindings.is_empty());
  }

  #[test]
  fn failing_restore_does_not_block_the_rest() {
    let mut settings = settings();
    let mut bindings = VariableBindings::new();
    bindings.set_include_in_build(&mut settings, "Other", false).unwrap();
    bindings.set_remote_catalog_enabled(&mut settings, true).unwrap();
    settings.groups.retain(|group| group.name != "Other");

    let failures = bindings.restore_all(&mut settings);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].action, "include-in-build flag of group 'Other'");
    assert!(!settings.remote_catalog_enabled());
  }
}
