//! Pack build orchestrator: bind, build, rewrite, and always restore.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use crate::addresses::simplify_addresses;
use crate::bindings::{RestoreFailure, VariableBindings, ensure_variable};
use crate::catalog::{CatalogRewriter, RewriteSummary, find_catalogs};
use crate::config::BuildOptions;
use crate::error::{
  ConfigurationError, PackBuildError, PackBuildResult, PostBuildWarning, StoreError, error_chain,
};
use crate::invoker::{BuildInvoker, BuildRequest};
use crate::manifest::emit_manifest;
use crate::models::{ContentPack, PackManifest};
use crate::paths::{normalize_separators, to_file_url, trim_trailing_separators};
use crate::project::PackLayout;
use crate::settings::BuildSettings;

/// Phases a pack build moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
  /// Nothing started.
  Idle,
  /// Resolving profile, output root and groups. Nothing is mutated yet.
  Preparing,
  /// Addresses simplified and variables rebound.
  Bound,
  /// External build running.
  Building,
  /// Catalog rewrite and manifest emission.
  Rewriting,
  /// Replaying the undo log.
  Restoring,
  /// Finished successfully.
  Done,
  /// Binding or building failed; restoration still follows.
  Failed,
}

impl fmt::Display for BuildPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Idle => "idle",
      Self::Preparing => "preparing",
      Self::Bound => "bound",
      Self::Building => "building",
      Self::Rewriting => "rewriting",
      Self::Restoring => "restoring",
      Self::Done => "done",
      Self::Failed => "failed",
    };
    f.write_str(name)
  }
}

/// Everything observed during a successful pack build.
#[derive(Debug, Clone)]
pub struct BuildReport {
  /// Pack that was built.
  pub pack_name: String,
  /// Physical folder the pack was built into.
  pub output_dir: PathBuf,
  /// Phases visited, in order.
  pub phases: Vec<BuildPhase>,
  /// Groups that were bound to the pack-scoped variables.
  pub groups: Vec<String>,
  /// Entries whose address was simplified.
  pub addresses_changed: usize,
  /// Catalog handed to the rewriter, if one was found.
  pub catalog: Option<PathBuf>,
  /// Rewrite outcome when the output lives under the installed-assets root.
  pub rewrite: Option<RewriteSummary>,
  /// Manifest written for the pack.
  pub manifest: Option<PathBuf>,
  /// Post-build problems that did not fail the build.
  pub warnings: Vec<PostBuildWarning>,
  /// Restore steps that failed. The rest of the log was still replayed.
  pub restore_failures: Vec<RestoreFailure>,
}

impl BuildReport {
  fn new(pack_name: &str) -> Self {
    Self {
      pack_name: pack_name.to_string(),
      output_dir: PathBuf::new(),
      phases: vec![BuildPhase::Idle],
      groups: Vec::new(),
      addresses_changed: 0,
      catalog: None,
      rewrite: None,
      manifest: None,
      warnings: Vec::new(),
      restore_failures: Vec::new(),
    }
  }

  fn enter(&mut self, phase: BuildPhase) {
    tracing::info!(pack = %self.pack_name, phase = %phase, "pack build phase");
    self.phases.push(phase);
  }

  /// Last phase reached.
  pub fn phase(&self) -> BuildPhase {
    self.phases.last().copied().unwrap_or(BuildPhase::Idle)
  }
}

/// Resolved inputs of one build, computed before anything is mutated.
#[derive(Debug, Clone)]
struct BuildPlan {
  profile_id: String,
  output_root: PathBuf,
  output_dir: PathBuf,
  physical_dir: String,
  load_url: String,
  folder_name: String,
  groups: Vec<String>,
  build_variable: String,
  load_variable: String,
}

/// High-level helper building one content pack at a time.
///
/// Builds are not reentrant: the undo log belongs to a single call, and the `&mut` borrow of
/// the settings store keeps a second build from running against it concurrently.
pub struct PackBuilder<'a> {
  layout: &'a PackLayout,
}

impl<'a> PackBuilder<'a> {
  /// Create a builder for the provided layout.
  pub fn new(layout: &'a PackLayout) -> Self {
    Self { layout }
  }

  /// Build `pack` through `invoker`, restoring every temporary change before returning.
  ///
  /// Pre-flight problems return [`PackBuildError::Configuration`] without touching `store`.
  /// Any later failure, or a panic inside the invoker, still replays the undo log first.
  pub fn build<S, B>(
    &self,
    store: &mut S,
    invoker: &mut B,
    pack: &ContentPack,
    options: &BuildOptions,
  ) -> PackBuildResult<BuildReport>
  where
    S: BuildSettings + ?Sized,
    B: BuildInvoker<S> + ?Sized,
  {
    let mut report = BuildReport::new(&pack.name);
    report.enter(BuildPhase::Preparing);
    let plan = match self.prepare(&*store, pack, options) {
      Ok(plan) => plan,
      Err(err) => {
        tracing::error!(pack = %pack.name, "pack build rejected: {err}");
        report.enter(BuildPhase::Failed);
        return Err(err.into());
      }
    };
    report.output_dir = plan.output_dir.clone();
    report.groups = plan.groups.clone();

    let mut bindings = VariableBindings::new();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
      self.run(store, invoker, pack, options, &plan, &mut bindings, &mut report)
    }));

    if !matches!(outcome, Ok(Ok(()))) {
      report.enter(BuildPhase::Failed);
    }
    report.enter(BuildPhase::Restoring);
    report.restore_failures = bindings.restore_all(store);
    if !report.restore_failures.is_empty() {
      tracing::error!(
        pack = %pack.name,
        failures = report.restore_failures.len(),
        "some settings could not be restored"
      );
    }

    match outcome {
      Ok(Ok(())) => {
        report.enter(BuildPhase::Done);
        Ok(report)
      }
      Ok(Err(err)) => {
        tracing::error!(pack = %pack.name, "pack build failed: {}", error_chain(&err));
        Err(err)
      }
      Err(payload) => panic::resume_unwind(payload),
    }
  }

  fn prepare<S>(
    &self,
    store: &S,
    pack: &ContentPack,
    options: &BuildOptions,
  ) -> Result<BuildPlan, ConfigurationError>
  where
    S: BuildSettings + ?Sized,
  {
    let name = pack.name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name != pack.name {
      return Err(ConfigurationError::InvalidPackName {
        pack: pack.name.clone(),
      });
    }

    let profile_id = options
      .profile_id
      .clone()
      .or_else(|| store.active_profile_id())
      .unwrap_or_default();
    if profile_id.is_empty() || !store.has_profile(&profile_id) {
      return Err(ConfigurationError::UnknownProfile {
        profile: profile_id,
      });
    }

    let output_root = options
      .output_root_override
      .clone()
      .unwrap_or_else(|| PathBuf::from(&self.layout.default_output_root));
    if output_root.as_os_str().is_empty() {
      return Err(ConfigurationError::EmptyOutputRoot {
        pack: pack.name.clone(),
      });
    }

    let candidates = pack.group_names();
    let groups: Vec<String> = candidates
      .iter()
      .filter(|group| match store.group(group) {
        Some(found) if found.has_schema() => true,
        Some(_) => {
          tracing::warn!(pack = %pack.name, group = %group, "group has no bundled schema, skipping");
          false
        }
        None => {
          tracing::warn!(pack = %pack.name, group = %group, "group not found, skipping");
          false
        }
      })
      .cloned()
      .collect();
    if groups.is_empty() {
      return Err(ConfigurationError::NoValidGroups {
        pack: pack.name.clone(),
        groups: candidates.join(", "),
      });
    }

    let output_dir = self.layout.pack_output_dir(&output_root, pack);
    let physical_dir = trim_trailing_separators(&normalize_separators(&output_dir)).to_string();
    Ok(BuildPlan {
      profile_id,
      load_url: to_file_url(&output_dir),
      physical_dir,
      output_root,
      output_dir,
      folder_name: pack.output_folder_name().to_string(),
      groups,
      build_variable: self.layout.build_path_variable(&pack.name),
      load_variable: self.layout.load_path_variable(&pack.name),
    })
  }

  #[allow(clippy::too_many_arguments)]
  fn run<S, B>(
    &self,
    store: &mut S,
    invoker: &mut B,
    pack: &ContentPack,
    options: &BuildOptions,
    plan: &BuildPlan,
    bindings: &mut VariableBindings,
    report: &mut BuildReport,
  ) -> PackBuildResult<()>
  where
    S: BuildSettings + ?Sized,
    B: BuildInvoker<S> + ?Sized,
  {
    report.addresses_changed = simplify_addresses(store, &plan.groups).changed;
    self
      .bind(store, pack, options, plan, bindings)
      .map_err(|source| PackBuildError::Binding { source })?;
    report.enter(BuildPhase::Bound);

    report.enter(BuildPhase::Building);
    let request = BuildRequest {
      pack_name: pack.name.clone(),
      profile_id: plan.profile_id.clone(),
      build_path_variable: plan.build_variable.clone(),
      load_path_variable: plan.load_variable.clone(),
      output_dir: plan.output_dir.clone(),
    };
    invoker.build(&*store, &request)?;
    tracing::info!(pack = %pack.name, dir = %plan.physical_dir, "bundle build finished");

    report.enter(BuildPhase::Rewriting);
    self.post_build(pack, options, plan, report);
    Ok(())
  }

  fn bind<S>(
    &self,
    store: &mut S,
    pack: &ContentPack,
    options: &BuildOptions,
    plan: &BuildPlan,
    bindings: &mut VariableBindings,
  ) -> Result<(), StoreError>
  where
    S: BuildSettings + ?Sized,
  {
    let build_variable = ensure_variable(store, &plan.build_variable, &plan.physical_dir);
    let load_variable = ensure_variable(store, &plan.load_variable, &plan.load_url);

    bindings.set_pack_scoped_value(store, &plan.profile_id, &build_variable, &plan.physical_dir)?;
    bindings.set_pack_scoped_value(store, &plan.profile_id, &load_variable, &plan.load_url)?;

    for group in &plan.groups {
      bindings.bind_group_paths(store, group, &build_variable, &load_variable)?;
    }
    bindings.bind_catalog_paths(store, &build_variable, &load_variable)?;

    if options.enable_remote_catalog {
      bindings.set_remote_catalog_enabled(store, true)?;
    }
    if options.set_player_version_override {
      bindings.set_player_version_override(store, &pack.name)?;
    }
    if options.disable_other_groups {
      for group in store.group_names() {
        let has_schema = store.group(&group).is_some_and(|found| found.has_schema());
        if has_schema {
          let include = plan.groups.contains(&group);
          bindings.set_include_in_build(store, &group, include)?;
        }
      }
    }

    tracing::info!(
      pack = %pack.name,
      groups = plan.groups.len(),
      build_path = %plan.physical_dir,
      load_path = %plan.load_url,
      "bound pack-scoped path variables"
    );
    Ok(())
  }

  fn post_build(
    &self,
    pack: &ContentPack,
    options: &BuildOptions,
    plan: &BuildPlan,
    report: &mut BuildReport,
  ) {
    let rewriter = CatalogRewriter::new(self.layout);
    let token_base = rewriter.token_base_for(&plan.output_root);

    let catalogs = match find_catalogs(self.layout, &plan.output_dir) {
      Ok(catalogs) => catalogs,
      Err(err) => {
        tracing::error!(pack = %pack.name, "failed to search for catalogs: {err:#}");
        Vec::new()
      }
    };

    match catalogs.split_first() {
      None => {
        tracing::warn!(pack = %pack.name, dir = %plan.output_dir.display(), "no catalog produced");
        report.warnings.push(PostBuildWarning::CatalogNotFound {
          dir: plan.output_dir.clone(),
        });
      }
      Some((catalog, rest)) => {
        if !rest.is_empty() {
          tracing::debug!(pack = %pack.name, extra = rest.len(), "ignoring additional catalogs");
        }
        report.catalog = Some(catalog.clone());
        match &token_base {
          Some(token_base) => {
            let (summary, warnings) = rewriter.rewrite_or_discard_hash(
              catalog,
              &plan.physical_dir,
              token_base,
              &plan.folder_name,
            );
            report.rewrite = summary;
            report.warnings.extend(warnings);
          }
          None => tracing::info!(
            pack = %pack.name,
            "output is outside the installed-assets root, catalog paths left as built"
          ),
        }
      }
    }

    if options.write_manifest_json {
      let manifest = self.manifest_for(pack, plan, token_base.as_deref(), report);
      let file_name = options
        .manifest_file_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| self.layout.manifest_file_name(&pack.name));
      match emit_manifest(&plan.output_dir, &file_name, &manifest) {
        Ok(path) => report.manifest = Some(path),
        Err(warning) => report.warnings.push(warning),
      }
    }
  }

  fn manifest_for(
    &self,
    pack: &ContentPack,
    plan: &BuildPlan,
    token_base: Option<&str>,
    report: &BuildReport,
  ) -> PackManifest {
    let runtime_root = token_base
      .filter(|_| report.rewrite.is_some())
      .map(|base| CatalogRewriter::replacement_prefix(base, &plan.folder_name));

    let catalog_path = report.catalog.as_deref().map(|catalog| match &runtime_root {
      Some(prefix) => format!("{prefix}{}", relative_backslash_path(&plan.output_dir, catalog)),
      None => normalize_separators(catalog),
    });

    let load_path = pack
      .remote_load_root
      .clone()
      .filter(|root| !root.trim().is_empty())
      .or_else(|| runtime_root.map(|prefix| prefix.trim_end_matches('\\').to_string()))
      .unwrap_or_else(|| plan.load_url.clone());

    PackManifest {
      pack_name: pack.name.clone(),
      catalog_path,
      load_path,
      bundle_directory: plan.physical_dir.clone(),
    }
  }
}

fn relative_backslash_path(root: &Path, path: &Path) -> String {
  let relative = path.strip_prefix(root).unwrap_or(path);
  normalize_separators(relative).replace('/', "\\")
}
