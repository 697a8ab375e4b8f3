#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod addresses;
pub mod bindings;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod error;
pub mod invoker;
pub mod manifest;
pub mod models;
pub mod paths;
pub mod project;
pub mod settings;

pub use addresses::{SimplifyReport, simplify_addresses};
pub use bindings::{RestoreFailure, UndoAction, VariableBindings};
pub use builder::{BuildPhase, BuildReport, PackBuilder};
pub use catalog::{CatalogRewriter, RewriteSummary, find_catalogs};
pub use config::{BuildOptions, PipelineConfig};
pub use error::{
  BuildInvocationError, ConfigurationError, PackBuildError, PackBuildResult, PostBuildWarning,
  RewriteError, StoreError,
};
pub use invoker::{BuildInvoker, BuildRequest, CommandInvoker};
pub use models::{ContentPack, Entry, Group, PackManifest, PathBindings};
pub use project::PackLayout;
pub use settings::{BuildSettings, GlobalSettings, GroupRegistry, MemorySettings, ProfileStore};
