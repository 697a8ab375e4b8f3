//! Error and warning types shared by the pack build pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type returned by [`crate::PackBuilder::build`].
pub type PackBuildResult<T> = Result<T, PackBuildError>;

/// Failure of a whole pack build.
#[derive(Debug, Error)]
pub enum PackBuildError {
  /// Pre-flight check failed before anything was mutated.
  #[error(transparent)]
  Configuration(#[from] ConfigurationError),
  /// The external build step failed. Bindings were restored before this was returned.
  #[error(transparent)]
  BuildInvocation(#[from] BuildInvocationError),
  /// Rebinding the pack's variables failed. Whatever was already rebound has been restored.
  #[error("failed to bind pack variables")]
  Binding {
    /// Store error raised by the rejected write.
    source: StoreError,
  },
}

/// Pre-flight problems detected while preparing a build.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
  /// Neither the options nor the pipeline configuration name an output root.
  #[error("no output root configured for pack '{pack}'")]
  EmptyOutputRoot {
    /// Pack being built.
    pack: String,
  },
  /// None of the pack's groups exist with a bundled schema.
  #[error("pack '{pack}' has no group with a bundled schema (looked for: {groups})")]
  NoValidGroups {
    /// Pack being built.
    pack: String,
    /// Comma separated list of the group names that were considered.
    groups: String,
  },
  /// The requested profile does not exist, or no profile is active.
  #[error("profile '{profile}' does not exist")]
  UnknownProfile {
    /// Requested profile id (empty when no profile is active).
    profile: String,
  },
  /// The pack name cannot be used as a folder or variable name.
  #[error("invalid pack name '{pack}'")]
  InvalidPackName {
    /// Offending pack name.
    pack: String,
  },
}

/// Failure reported by a [`crate::BuildInvoker`].
#[derive(Debug, Error)]
pub enum BuildInvocationError {
  /// The builder reported a failure.
  #[error("bundle build failed: {message}")]
  Failed {
    /// Builder supplied description.
    message: String,
  },
  /// The external build command could not be started.
  #[error("failed to start build command '{program}'")]
  Spawn {
    /// Program that was executed.
    program: String,
    /// Underlying I/O error.
    source: std::io::Error,
  },
  /// The external build command exited unsuccessfully.
  #[error("build command '{program}' exited with {status}")]
  CommandFailed {
    /// Program that was executed.
    program: String,
    /// Rendered exit status.
    status: String,
  },
}

/// Failure while rewriting a catalog. Always downgraded to a warning by the pipeline.
#[derive(Debug, Error)]
pub enum RewriteError {
  /// Reading the catalog failed.
  #[error("failed to read catalog {path}")]
  Read {
    /// Catalog path.
    path: PathBuf,
    /// Underlying I/O error.
    source: std::io::Error,
  },
  /// Writing the catalog or its hash failed.
  #[error("failed to write {path}")]
  Write {
    /// Path that could not be written.
    path: PathBuf,
    /// Underlying I/O error.
    source: std::io::Error,
  },
  /// The physical output directory is not below the installed-assets root.
  #[error("{path} is not below the installed-assets root '{marker}'")]
  OutsideInstalledRoot {
    /// Physical output directory.
    path: String,
    /// Marker directory name.
    marker: String,
  },
}

/// Failure reported by a settings store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
  /// No profile with the given id.
  #[error("unknown profile '{0}'")]
  UnknownProfile(String),
  /// No variable with the given name.
  #[error("unknown variable '{0}'")]
  UnknownVariable(String),
  /// No group with the given name.
  #[error("unknown group '{0}'")]
  UnknownGroup(String),
  /// The group has no bundled schema to hold path bindings.
  #[error("group '{0}' has no bundled schema")]
  MissingSchema(String),
  /// No entry with the given id in the group.
  #[error("unknown entry '{entry}' in group '{group}'")]
  UnknownEntry {
    /// Group name.
    group: String,
    /// Entry id.
    entry: String,
  },
  /// The store rejected the write.
  #[error("settings store rejected the change: {0}")]
  Rejected(String),
}

/// Non-fatal problem found after the bundle build finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostBuildWarning {
  /// The build produced no catalog under the pack folder.
  CatalogNotFound {
    /// Folder that was searched.
    dir: PathBuf,
  },
  /// Rewriting the catalog failed; its hash file was removed.
  RewriteFailed {
    /// Catalog that was being rewritten.
    catalog: PathBuf,
    /// Rendered error.
    message: String,
  },
  /// A stale hash file could not be removed after a failed rewrite.
  HashRemovalFailed {
    /// Hash file path.
    hash: PathBuf,
    /// Rendered error.
    message: String,
  },
  /// The manifest descriptor could not be written.
  ManifestWriteFailed {
    /// Manifest path.
    path: PathBuf,
    /// Rendered error.
    message: String,
  },
}

impl std::fmt::Display for PostBuildWarning {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::CatalogNotFound { dir } => write!(f, "no catalog found under {}", dir.display()),
      Self::RewriteFailed { catalog, message } => {
        write!(f, "failed to rewrite {}: {}", catalog.display(), message)
      }
      Self::HashRemovalFailed { hash, message } => {
        write!(f, "failed to remove stale hash {}: {}", hash.display(), message)
      }
      Self::ManifestWriteFailed { path, message } => {
        write!(f, "failed to write manifest {}: {}", path.display(), message)
      }
    }
  }
}

/// Render an error followed by each of its causes, separated by `: `.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
  let mut rendered = err.to_string();
  let mut source = err.source();
  while let Some(cause) = source {
    rendered.push_str(": ");
    rendered.push_str(&cause.to_string());
    source = cause.source();
  }
  rendered
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io;

  #[test]
  fn configuration_errors_render_pack_name() {
    let err = ConfigurationError::NoValidGroups {
      pack: "Vanilla".into(),
      groups: "Vanilla, Extras".into(),
    };
    assert_eq!(
      err.to_string(),
      "pack 'Vanilla' has no group with a bundled schema (looked for: Vanilla, Extras)"
    );
  }

  #[test]
  fn pack_build_error_is_transparent() {
    let err = PackBuildError::from(ConfigurationError::EmptyOutputRoot {
      pack: "Vanilla".into(),
    });
    assert_eq!(err.to_string(), "no output root configured for pack 'Vanilla'");
  }

  #[test]
  fn warnings_render_paths() {
    let warning = PostBuildWarning::CatalogNotFound {
      dir: PathBuf::from("out/Vanilla"),
    };
    assert_eq!(warning.to_string(), "no catalog found under out/Vanilla");
  }

  #[test]
  fn causes_are_rendered_once() {
    let err = RewriteError::Read {
      path: PathBuf::from("out/catalog.json"),
      source: io::Error::new(io::ErrorKind::InvalidData, "stream did not contain valid UTF-8"),
    };
    let expected = "failed to read catalog out/catalog.json: stream did not contain valid UTF-8";
    assert_eq!(error_chain(&err), expected);
    assert_eq!(format!("{:#}", anyhow::Error::from(err)), expected);
  }

  #[test]
  fn binding_errors_keep_the_store_error_as_cause() {
    let err = PackBuildError::Binding {
      source: StoreError::MissingSchema("Raw".into()),
    };
    assert_eq!(err.to_string(), "failed to bind pack variables");
    assert_eq!(
      error_chain(&err),
      "failed to bind pack variables: group 'Raw' has no bundled schema"
    );
  }
}
