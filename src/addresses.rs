//! Rewrite entry addresses to short, globally unique names before a build.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::StoreError;
use crate::settings::GroupRegistry;

/// Outcome of [`simplify_addresses`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimplifyReport {
  /// Number of entries whose address changed.
  pub changed: usize,
  /// Groups that were marked as modified, in first-touched order.
  pub modified_groups: Vec<String>,
  /// Entries that could not be updated, with the store error.
  pub failures: Vec<(String, String, StoreError)>,
}

/// Set every resolvable, non-folder entry's address to its file's base name.
///
/// Duplicates are suffixed `_2`, `_3`, … in first-seen order across all `groups` of the call.
/// Entries already carrying their target address are not written. Unknown groups, folders and
/// entries without a backing file are skipped.
pub fn simplify_addresses<R>(registry: &mut R, groups: &[String]) -> SimplifyReport
where
  R: GroupRegistry + ?Sized,
{
  let mut report = SimplifyReport::default();
  let mut allocator = AddressAllocator::default();
  let mut touched = BTreeSet::new();

  for group_name in groups {
    let Some(group) = registry.group(group_name) else {
      continue;
    };

    let planned: Vec<(String, String)> = group
      .entries
      .iter()
      .filter(|entry| !entry.is_folder)
      .filter_map(|entry| {
        let stem = entry.file_stem()?;
        let target = allocator.allocate(&stem);
        (entry.address != target).then(|| (entry.guid.clone(), target))
      })
      .collect();

    for (guid, address) in planned {
      match registry.set_entry_address(group_name, &guid, &address) {
        Ok(()) => {
          report.changed += 1;
          if touched.insert(group_name.clone()) {
            report.modified_groups.push(group_name.clone());
          }
        }
        Err(err) => {
          tracing::warn!(group = %group_name, entry = %guid, "failed to simplify address: {err}");
          report.failures.push((group_name.clone(), guid, err));
        }
      }
    }
  }

  for group_name in &report.modified_groups {
    registry.mark_modified(group_name);
  }

  if report.changed > 0 {
    tracing::info!(
      changed = report.changed,
      groups = report.modified_groups.len(),
      "simplified entry addresses"
    );
  }

  report
}

/// Hands out unique addresses derived from base names.
#[derive(Debug, Default)]
struct AddressAllocator {
  used: BTreeSet<String>,
  next_suffix: BTreeMap<String, usize>,
}

impl AddressAllocator {
  fn allocate(&mut self, base: &str) -> String {
    if self.used.insert(base.to_string()) {
      self.next_suffix.insert(base.to_string(), 2);
      return base.to_string();
    }

    let counter = self.next_suffix.entry(base.to_string()).or_insert(2);
    loop {
      let candidate = format!("{base}_{counter}");
      *counter += 1;
      if self.used.insert(candidate.clone()) {
        return candidate;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{Entry, Group, PathBindings};
  use crate::settings::MemorySettings;
  use pretty_assertions::assert_eq;

  fn settings() -> MemorySettings {
    let mut settings = MemorySettings::with_profile("default");
    let mut hats = Group::bundled("Hats", PathBindings::default());
    hats.entries = vec![
      Entry::new("a", "Assets/Vanilla/Hat.prefab", "Assets/Vanilla/Hat.prefab"),
      Entry::new("b", "Assets/Extra/Hat.prefab", "Assets/Extra/Hat.prefab"),
      Entry::new("c", "Assets/Vanilla/Boot.prefab", "Boot"),
      Entry {
        guid: "d".into(),
        asset_path: Some("Assets/Vanilla".into()),
        address: "Assets/Vanilla".into(),
        is_folder: true,
      },
      Entry {
        guid: "e".into(),
        asset_path: None,
        address: "ghost".into(),
        is_folder: false,
      },
    ];
    let mut coats = Group::bundled("Coats", PathBindings::default());
    coats.entries = vec![Entry::new("f", "Assets/Coats/Hat.mat", "Hat.mat")];
    settings.insert_group(hats);
    settings.insert_group(coats);
    settings
  }

  fn addresses(settings: &MemorySettings) -> Vec<String> {
    settings
      .groups
      .iter()
      .flat_map(|group| group.entries.iter().map(|entry| entry.address.clone()))
      .collect()
  }

  #[test]
  fn shortens_addresses_and_suffixes_duplicates_across_groups() {
    let mut settings = settings();
    let report = simplify_addresses(&mut settings, &["Hats".into(), "Coats".into()]);

    assert_eq!(
      addresses(&settings),
      vec!["Hat", "Hat_2", "Boot", "Assets/Vanilla", "ghost", "Hat_3"]
    );
    assert_eq!(report.changed, 3);
    assert_eq!(report.modified_groups, vec!["Hats", "Coats"]);
    assert!(settings.modified_groups().contains("Coats"));
  }

  #[test]
  fn second_pass_is_a_no_op() {
    let mut settings = settings();
    let groups = vec!["Hats".to_string(), "Coats".to_string()];
    simplify_addresses(&mut settings, &groups);
    settings.take_modified_groups();

    let report = simplify_addresses(&mut settings, &groups);
    assert_eq!(report, SimplifyReport::default());
    assert!(settings.modified_groups().is_empty());
  }

  #[test]
  fn literal_suffix_names_do_not_collide() {
    let mut settings = MemorySettings::with_profile("default");
    let mut group = Group::bundled("G", PathBindings::default());
    group.entries = vec![
      Entry::new("a", "A/Hat.prefab", ""),
      Entry::new("b", "B/Hat_2.prefab", ""),
      Entry::new("c", "C/Hat.prefab", ""),
    ];
    settings.insert_group(group);

    simplify_addresses(&mut settings, &["G".into()]);
    assert_eq!(addresses(&settings), vec!["Hat", "Hat_2", "Hat_3"]);
  }

  #[test]
  fn empty_input_is_a_no_op() {
    let mut settings = settings();
    let before = settings.clone();
    let report = simplify_addresses(&mut settings, &[]);
    assert_eq!(report.changed, 0);
    assert_eq!(settings, before);
  }
}
