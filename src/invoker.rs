//! The opaque "build everything currently configured" step.

use std::path::PathBuf;
use std::process::Command;

use crate::error::BuildInvocationError;
use crate::settings::ProfileStore;

/// Context handed to a [`BuildInvoker`]: where the bound variables currently point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
  /// Pack being built.
  pub pack_name: String,
  /// Profile whose variables were rebound.
  pub profile_id: String,
  /// Pack-scoped build path variable name.
  pub build_path_variable: String,
  /// Pack-scoped load path variable name.
  pub load_path_variable: String,
  /// Physical folder the build is expected to write to.
  pub output_dir: PathBuf,
}

/// Runs the underlying bundle build once, writing bundles and catalogs wherever the currently
/// bound variables point.
pub trait BuildInvoker<S: ?Sized> {
  /// Build every included group.
  fn build(&mut self, settings: &S, request: &BuildRequest) -> Result<(), BuildInvocationError>;
}

impl<S, F> BuildInvoker<S> for F
where
  S: ?Sized,
  F: FnMut(&S, &BuildRequest) -> Result<(), BuildInvocationError>,
{
  fn build(&mut self, settings: &S, request: &BuildRequest) -> Result<(), BuildInvocationError> {
    self(settings, request)
  }
}

/// Invoker delegating to an external command.
///
/// The bound values are exported as `CONTENT_PACK_NAME`, `CONTENT_PACK_PROFILE`,
/// `CONTENT_PACK_BUILD_PATH` and `CONTENT_PACK_LOAD_PATH`.
#[derive(Debug, Clone)]
pub struct CommandInvoker {
  program: String,
  args: Vec<String>,
}

impl CommandInvoker {
  /// Invoker running `program` with `args`.
  pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = String>) -> Self {
    Self {
      program: program.into(),
      args: args.into_iter().collect(),
    }
  }

  fn command<S: ProfileStore + ?Sized>(&self, settings: &S, request: &BuildRequest) -> Command {
    let build_path = settings
      .value(&request.profile_id, &request.build_path_variable)
      .unwrap_or_default();
    let load_path = settings
      .value(&request.profile_id, &request.load_path_variable)
      .unwrap_or_default();

    let mut command = Command::new(&self.program);
    command
      .args(&self.args)
      .env("CONTENT_PACK_NAME", &request.pack_name)
      .env("CONTENT_PACK_PROFILE", &request.profile_id)
      .env("CONTENT_PACK_BUILD_PATH", build_path)
      .env("CONTENT_PACK_LOAD_PATH", load_path);
    command
  }
}

impl<S: ProfileStore + ?Sized> BuildInvoker<S> for CommandInvoker {
  fn build(&mut self, settings: &S, request: &BuildRequest) -> Result<(), BuildInvocationError> {
    tracing::info!(program = %self.program, pack = %request.pack_name, "running build command");
    let status = self
      .command(settings, request)
      .status()
      .map_err(|source| BuildInvocationError::Spawn {
        program: self.program.clone(),
        source,
      })?;

    if !status.success() {
      return Err(BuildInvocationError::CommandFailed {
        program: self.program.clone(),
        status: status.to_string(),
      });
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::settings::MemorySettings;

  fn request() -> BuildRequest {
    BuildRequest {
      pack_name: "Vanilla".into(),
      profile_id: "default".into(),
      build_path_variable: "Pack_Vanilla_BuildPath".into(),
      load_path_variable: "Pack_Vanilla_LoadPath".into(),
      output_dir: PathBuf::from("/g/out/Vanilla"),
    }
  }

  fn settings() -> MemorySettings {
    let mut settings = MemorySettings::with_profile("default");
    settings
      .create_variable("Pack_Vanilla_BuildPath", "/g/out/Vanilla")
      .unwrap();
    settings
      .create_variable("Pack_Vanilla_LoadPath", "file:///g/out/Vanilla")
      .unwrap();
    settings
  }

  #[test]
  fn exports_bound_values_to_the_command() {
    let invoker = CommandInvoker::new("builder", ["--all".to_string()]);
    let command = invoker.command(&settings(), &request());
    let envs: Vec<(String, String)> = command
      .get_envs()
      .filter_map(|(key, value)| {
        Some((
          key.to_string_lossy().to_string(),
          value?.to_string_lossy().to_string(),
        ))
      })
      .collect();

    assert!(envs.contains(&("CONTENT_PACK_BUILD_PATH".into(), "/g/out/Vanilla".into())));
    assert!(envs.contains(&("CONTENT_PACK_LOAD_PATH".into(), "file:///g/out/Vanilla".into())));
    assert!(envs.contains(&("CONTENT_PACK_NAME".into(), "Vanilla".into())));
    assert_eq!(command.get_args().count(), 1);
  }

  #[test]
  fn missing_program_is_a_spawn_error() {
    let mut invoker = CommandInvoker::new("content-pack-missing-builder-binary", Vec::new());
    let err = invoker.build(&settings(), &request()).unwrap_err();
    assert!(matches!(err, BuildInvocationError::Spawn { .. }));
  }

  #[test]
  fn closures_act_as_invokers() {
    let mut calls = 0;
    let mut invoker = |_: &MemorySettings, request: &BuildRequest| {
      calls += 1;
      assert_eq!(request.pack_name, "Vanilla");
      Ok::<(), BuildInvocationError>(())
    };
    BuildInvoker::build(&mut invoker, &settings(), &request()).unwrap();
    assert_eq!(calls, 1);
  }
}
