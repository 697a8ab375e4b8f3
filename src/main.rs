use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use content_pack_bundler::paths::{content_hash, hash_path_for, normalize_separators};
use content_pack_bundler::{
  BuildOptions, CatalogRewriter, CommandInvoker, ContentPack, MemorySettings, PackBuilder,
  PackLayout, PipelineConfig, RewriteError, find_catalogs, simplify_addresses,
};

#[derive(Parser)]
#[command(name = "content-pack", version, about = "Build relocatable content packs")]
struct Cli {
  /// Pipeline configuration file (defaults to ./content_pack.config.json when present).
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Debug logging.
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Errors only.
  #[arg(short, long, global = true, conflicts_with = "verbose")]
  quiet: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Isolate a pack, run the build command and rewrite its catalog.
  Build(BuildArgs),
  /// Rewrite the catalogs already present in a pack folder.
  RewriteCatalog(RewriteArgs),
  /// Print (or write) the content hash of a file.
  Hash {
    /// File to hash.
    file: PathBuf,
    /// Write the hash next to the file using the configured extension.
    #[arg(long)]
    write: bool,
  },
  /// Shorten entry addresses in the given groups and save the settings.
  SimplifyAddresses {
    /// Settings store (JSON).
    #[arg(long)]
    settings: PathBuf,
    /// Groups to process.
    #[arg(long = "group", required = true)]
    groups: Vec<String>,
  },
}

#[derive(Args)]
struct BuildArgs {
  /// Settings store (JSON). Address changes are saved back; everything else is restored.
  #[arg(long)]
  settings: PathBuf,
  /// Pack name.
  #[arg(long)]
  pack: String,
  /// Groups of the pack, the pack name when omitted.
  #[arg(long = "group")]
  groups: Vec<String>,
  /// Output folder below the root, the pack name when omitted.
  #[arg(long)]
  subfolder: Option<String>,
  /// Runtime load root recorded in the manifest.
  #[arg(long)]
  remote_load_root: Option<String>,
  /// Build options file (JSON, camelCase keys). Flags below override it.
  #[arg(long)]
  options: Option<PathBuf>,
  /// Output root; the pack folder is created beneath it.
  #[arg(long)]
  output_root: Option<PathBuf>,
  /// Profile whose variables are rebound.
  #[arg(long)]
  profile: Option<String>,
  /// Force the remote catalog on while building.
  #[arg(long)]
  enable_remote_catalog: bool,
  /// Exclude every group outside the pack from the build.
  #[arg(long)]
  disable_other_groups: bool,
  /// Set the player version override to the pack name while building.
  #[arg(long)]
  player_version_override: bool,
  /// Skip writing the manifest descriptor.
  #[arg(long)]
  no_manifest: bool,
  /// Manifest file name, `<pack>.manifest.json` when omitted.
  #[arg(long)]
  manifest_name: Option<String>,
  /// Build command and its arguments.
  #[arg(last = true, required = true)]
  command: Vec<String>,
}

#[derive(Args)]
struct RewriteArgs {
  /// Pack folder holding the catalog.
  pack_dir: PathBuf,
  /// Output root the pack folder lives in, its parent when omitted.
  #[arg(long)]
  output_root: Option<PathBuf>,
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_logger(cli.verbose, cli.quiet);

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      tracing::error!("{err:#}");
      ExitCode::FAILURE
    }
  }
}

fn init_logger(verbose: bool, quiet: bool) {
  let filter = if verbose {
    EnvFilter::new("content_pack_bundler=debug,content_pack=debug")
  } else if quiet {
    EnvFilter::new("error")
  } else {
    EnvFilter::try_from_default_env()
      .unwrap_or_else(|_| EnvFilter::new("content_pack_bundler=info,content_pack=info"))
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}

fn run(cli: Cli) -> Result<()> {
  let layout = load_layout(cli.config.as_deref())?;
  match cli.command {
    Command::Build(args) => build(&layout, args),
    Command::RewriteCatalog(args) => rewrite_catalog(&layout, &args),
    Command::Hash { file, write } => hash(&layout, &file, write),
    Command::SimplifyAddresses { settings, groups } => {
      let mut store = MemorySettings::load(&settings)?;
      let report = simplify_addresses(&mut store, &groups);
      store.save(&settings)?;
      println!("{} address(es) changed", report.changed);
      Ok(())
    }
  }
}

fn load_layout(config: Option<&Path>) -> Result<PackLayout> {
  let config = match config {
    Some(path) => PipelineConfig::from_path(path)?,
    None => PipelineConfig::discover(&std::env::current_dir()?),
  };
  Ok(config.into_layout())
}

fn build(layout: &PackLayout, args: BuildArgs) -> Result<()> {
  let mut options = match &args.options {
    Some(path) => BuildOptions::from_path(path)?,
    None => BuildOptions::default(),
  };
  options.profile_id = args.profile.or(options.profile_id);
  options.output_root_override = args.output_root.or(options.output_root_override);
  options.manifest_file_name = args.manifest_name.or(options.manifest_file_name);
  options.enable_remote_catalog |= args.enable_remote_catalog;
  options.disable_other_groups |= args.disable_other_groups;
  options.set_player_version_override |= args.player_version_override;
  if args.no_manifest {
    options.write_manifest_json = false;
  }

  let mut pack = ContentPack::with_groups(args.pack, args.groups);
  pack.output_subfolder = args.subfolder;
  pack.remote_load_root = args.remote_load_root;

  let Some((program, program_args)) = args.command.split_first() else {
    bail!("missing build command");
  };
  let mut invoker = CommandInvoker::new(program.clone(), program_args.to_vec());

  let mut store = MemorySettings::load(&args.settings)?;
  let result = PackBuilder::new(layout).build(&mut store, &mut invoker, &pack, &options);
  // Restoration already ran; persist it together with any simplified addresses.
  store.save(&args.settings)?;
  let report = result?;

  for warning in &report.warnings {
    tracing::warn!("{warning}");
  }
  println!("built {} into {}", report.pack_name, report.output_dir.display());
  if let Some(manifest) = &report.manifest {
    println!("manifest: {}", manifest.display());
  }
  if !report.restore_failures.is_empty() {
    bail!(
      "{} setting(s) could not be restored, check {}",
      report.restore_failures.len(),
      args.settings.display()
    );
  }
  Ok(())
}

fn rewrite_catalog(layout: &PackLayout, args: &RewriteArgs) -> Result<()> {
  let pack_dir = &args.pack_dir;
  let folder = pack_dir
    .file_name()
    .map(|name| name.to_string_lossy().to_string())
    .context("pack folder has no name")?;
  let output_root = match &args.output_root {
    Some(root) => root.clone(),
    None => pack_dir
      .parent()
      .map(Path::to_path_buf)
      .context("pack folder has no parent")?,
  };

  let rewriter = CatalogRewriter::new(layout);
  let Some(token_base) = rewriter.token_base_for(&output_root) else {
    return Err(
      RewriteError::OutsideInstalledRoot {
        path: normalize_separators(&output_root),
        marker: layout.installed_assets_marker.clone(),
      }
      .into(),
    );
  };

  let catalogs = find_catalogs(layout, pack_dir)?;
  if catalogs.is_empty() {
    bail!("no catalog found under {}", pack_dir.display());
  }
  let physical = normalize_separators(pack_dir);
  let mut failed = 0;
  for catalog in catalogs {
    let (summary, warnings) =
      rewriter.rewrite_or_discard_hash(&catalog, &physical, &token_base, &folder);
    for warning in &warnings {
      tracing::warn!("{warning}");
    }
    match summary {
      Some(summary) => println!(
        "{}: {} replacement(s), hash {}",
        summary.catalog.display(),
        summary.replacements,
        summary.hash
      ),
      None => failed += 1,
    }
  }
  if failed > 0 {
    bail!("{failed} catalog(s) could not be rewritten");
  }
  Ok(())
}

fn hash(layout: &PackLayout, file: &Path, write: bool) -> Result<()> {
  let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
  let hash = content_hash(&bytes);
  if write {
    let hash_path = hash_path_for(file, &layout.hash_extension);
    fs::write(&hash_path, &hash)
      .with_context(|| format!("failed to write {}", hash_path.display()))?;
  }
  println!("{hash}");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn unreadable_catalog_fails_and_leaves_no_hash() {
    let temp = tempdir().unwrap();
    let pack_dir = temp.path().join("g/StreamingAssets/Addr/Vanilla");
    fs::create_dir_all(&pack_dir).unwrap();
    fs::write(pack_dir.join("catalog_1.json"), [0xff, 0xfe, 0x00]).unwrap();
    fs::write(pack_dir.join("catalog_1.hash"), "stale").unwrap();

    let args = RewriteArgs {
      pack_dir: pack_dir.clone(),
      output_root: None,
    };
    let err = rewrite_catalog(&PackLayout::default(), &args).unwrap_err();

    assert_eq!(err.to_string(), "1 catalog(s) could not be rewritten");
    assert!(!pack_dir.join("catalog_1.hash").exists());
  }

  #[test]
  fn rewrites_catalog_in_place() {
    let temp = tempdir().unwrap();
    let pack_dir = temp.path().join("g/StreamingAssets/Addr/Vanilla");
    fs::create_dir_all(&pack_dir).unwrap();
    let physical = normalize_separators(&pack_dir);
    fs::write(pack_dir.join("catalog_1.json"), format!(r#"["{physical}/a.bundle"]"#)).unwrap();

    let args = RewriteArgs {
      pack_dir: pack_dir.clone(),
      output_root: None,
    };
    rewrite_catalog(&PackLayout::default(), &args).unwrap();

    let catalog = fs::read_to_string(pack_dir.join("catalog_1.json")).unwrap();
    assert_eq!(catalog, r#"["{InstalledAssetsToken}\\Addr\\Vanilla\\a.bundle"]"#);
    assert_eq!(
      fs::read_to_string(pack_dir.join("catalog_1.hash")).unwrap(),
      content_hash(catalog.as_bytes())
    );
  }

  #[test]
  fn output_root_outside_installed_assets_is_rejected() {
    let temp = tempdir().unwrap();
    let pack_dir = temp.path().join("build/Vanilla");
    fs::create_dir_all(&pack_dir).unwrap();

    let args = RewriteArgs {
      pack_dir,
      output_root: None,
    };
    let err = rewrite_catalog(&PackLayout::default(), &args).unwrap_err();
    assert!(matches!(
      err.downcast_ref::<RewriteError>(),
      Some(RewriteError::OutsideInstalledRoot { .. })
    ));
  }
}
