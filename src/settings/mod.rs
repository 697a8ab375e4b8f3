//! Narrow interfaces over the global configuration the pipeline mutates.
//!
//! The pipeline never reaches for a singleton: callers pass a store implementing
//! [`BuildSettings`], which lets tests substitute [`MemorySettings`] or a failing fake.

mod memory;

pub use memory::{MemorySettings, ProfileVariable};

use crate::error::StoreError;
use crate::models::{Group, PathBindings};

/// Profile variables: named values scoped per profile id.
pub trait ProfileStore {
  /// Id of the profile currently active, if any.
  fn active_profile_id(&self) -> Option<String>;
  /// Whether a profile with this id exists.
  fn has_profile(&self, profile_id: &str) -> bool;
  /// Stable id of the variable with this name.
  fn variable_id(&self, name: &str) -> Option<String>;
  /// Create a variable, seeding every profile with `default_value`. Returns its id.
  fn create_variable(&mut self, name: &str, default_value: &str) -> Result<String, StoreError>;
  /// Value of a variable in a profile.
  fn value(&self, profile_id: &str, name: &str) -> Option<String>;
  /// Overwrite the value of a variable in a profile.
  fn set_value(&mut self, profile_id: &str, name: &str, value: &str) -> Result<(), StoreError>;
}

/// Registry of addressable groups.
pub trait GroupRegistry {
  /// Names of every registered group, in registry order.
  fn group_names(&self) -> Vec<String>;
  /// Group by name.
  fn group(&self, name: &str) -> Option<&Group>;
  /// Rebind the group's build and load path variables.
  fn set_path_bindings(&mut self, group: &str, bindings: PathBindings) -> Result<(), StoreError>;
  /// Toggle whether the group takes part in builds.
  fn set_include_in_build(&mut self, group: &str, include: bool) -> Result<(), StoreError>;
  /// Change the public address of one entry.
  fn set_entry_address(&mut self, group: &str, guid: &str, address: &str)
  -> Result<(), StoreError>;
  /// Flag the group as needing to be persisted.
  fn mark_modified(&mut self, group: &str);
}

/// Global build settings outside of any group.
pub trait GlobalSettings {
  /// Variables the remote catalog is built to and loaded from.
  fn catalog_bindings(&self) -> PathBindings;
  /// Rebind the remote catalog variables.
  fn set_catalog_bindings(&mut self, bindings: PathBindings) -> Result<(), StoreError>;
  /// Whether a remote catalog is produced.
  fn remote_catalog_enabled(&self) -> bool;
  /// Toggle remote catalog production.
  fn set_remote_catalog_enabled(&mut self, enabled: bool) -> Result<(), StoreError>;
  /// Player version override string used in catalog names.
  fn player_version_override(&self) -> String;
  /// Replace the player version override.
  fn set_player_version_override(&mut self, value: &str) -> Result<(), StoreError>;
}

/// Everything the pack pipeline needs from the configuration store.
pub trait BuildSettings: ProfileStore + GroupRegistry + GlobalSettings {}

impl<T: ProfileStore + GroupRegistry + GlobalSettings> BuildSettings for T {}
