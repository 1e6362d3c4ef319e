mod build;
mod graph;
mod layout;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::debug;

use appliance_lib::asset::{AssetGraph, AssetId};
use appliance_lib::assets::{ApplianceDiskImage, BootstrapIgnition, InstallIgnition, register_all};
use appliance_lib::config::{ApplianceConfig, EnvConfig};
use appliance_lib::release::OcRelease;
use appliance_lib::templates::DirTemplates;

pub use build::cmd_build;
pub use graph::cmd_graph;
pub use layout::cmd_layout;

/// Arguments shared by commands that assemble the asset graph.
#[derive(Debug, Args)]
pub struct SetupArgs {
  /// Path to the appliance configuration file
  #[arg(short, long, default_value = "appliance-config.yaml")]
  pub config: PathBuf,

  /// Asset directory; holds the cache, temp files and build outputs
  #[arg(short, long, default_value = ".")]
  pub dir: PathBuf,

  /// Directory containing the unit, script and disk templates
  #[arg(long, default_value = "data")]
  pub templates: PathBuf,

  /// Keep the machine from rebooting after bootstrap
  #[arg(long)]
  pub debug_bootstrap: bool,
}

/// What `build` produces.
///
/// The disk image needs the recovery and data ISOs, which external tools
/// build from the ignition outputs. It is therefore a separate step run after
/// those ISOs exist in the temp directory, and `all` stops at the ignitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
  /// bootstrap.ign, embedded in the recovery ISO
  BootstrapIgnition,
  /// install.ign, applied when the appliance installs
  InstallIgnition,
  /// guestfish.sh, user.cfg and layout.json; needs temp/recovery.iso and temp/data.iso
  DiskImage,
  /// Both ignitions
  All,
}

impl Target {
  pub fn asset_ids(self) -> Vec<AssetId> {
    match self {
      Target::BootstrapIgnition => vec![AssetId::of::<BootstrapIgnition>()],
      Target::InstallIgnition => vec![AssetId::of::<InstallIgnition>()],
      Target::DiskImage => vec![AssetId::of::<ApplianceDiskImage>()],
      Target::All => vec![AssetId::of::<InstallIgnition>(), AssetId::of::<BootstrapIgnition>()],
    }
  }
}

/// The configuration a run starts from.
pub struct Setup {
  pub config: ApplianceConfig,
  pub env: EnvConfig,
}

impl Setup {
  pub fn load(args: &SetupArgs) -> Result<Self> {
    let config = ApplianceConfig::load(&args.config)
      .with_context(|| format!("Failed to load config: {}", args.config.display()))?;
    let env = EnvConfig::new(&args.dir).with_debug_bootstrap(args.debug_bootstrap);
    Ok(Self { config, env })
  }

  /// Register every asset.
  ///
  /// `registry_config` is the pull secret `oc` authenticates with. Without it
  /// `oc` uses its default credentials.
  pub fn into_graph(self, templates: &Path, registry_config: Option<PathBuf>) -> AssetGraph {
    let mut release = OcRelease::new(self.config.release_image(), &self.env.cache_dir);
    if let Some(path) = registry_config {
      release = release.with_registry_config(path);
    }
    debug!(release = %release.release_image(), templates = %templates.display(), "assembling asset graph");

    let mut graph = AssetGraph::new();
    register_all(
      &mut graph,
      self.env,
      self.config,
      Rc::new(DirTemplates::new(templates)),
      Box::new(release),
    );
    graph
  }
}
