//! Implementation of the `appliance build` command.
//!
//! Only the requested target's outputs are written, and only after every
//! requested asset resolves. A failing generation leaves the asset directory
//! without new outputs. The pull secret `oc` needs is written to the temp
//! directory for the duration of the run and removed afterwards.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use appliance_lib::asset::{AssetGraph, AssetId};
use appliance_lib::assets::{ApplianceDiskImage, BootstrapIgnition, InstallIgnition};
use appliance_lib::consts::USER_CFG_FILE;

use super::{Setup, SetupArgs, Target};
use crate::output::{format_elapsed, format_size, print_field, print_success};

const PULL_SECRET_FILE: &str = "pull-secret.json";
const BOOTSTRAP_IGNITION_FILE: &str = "bootstrap.ign";
const INSTALL_IGNITION_FILE: &str = "install.ign";
const GUESTFISH_SCRIPT_FILE: &str = "guestfish.sh";
const LAYOUT_FILE: &str = "layout.json";

pub fn cmd_build(args: &SetupArgs, target: Target) -> Result<()> {
  let start = Instant::now();
  let setup = Setup::load(args)?;
  fs::create_dir_all(&setup.env.temp_dir)
    .with_context(|| format!("Failed to create {}", setup.env.temp_dir.display()))?;
  let pull_secret = PullSecret::write(&setup.env.temp_dir, &setup.config.spec.pull_secret)?;

  let mut graph = setup.into_graph(&args.templates, Some(pull_secret.path.clone()));
  let ids = target.asset_ids();
  resolve(&mut graph, &ids)?;
  drop(pull_secret);

  let mut written = Vec::new();
  if ids.contains(&AssetId::of::<BootstrapIgnition>())
    && let Some(bootstrap) = graph.get::<BootstrapIgnition>()
  {
    let json = serde_json::to_vec(&bootstrap.config).context("Failed to serialize bootstrap ignition")?;
    written.push(write_output(&args.dir, BOOTSTRAP_IGNITION_FILE, &json)?);
  }
  if ids.contains(&AssetId::of::<InstallIgnition>())
    && let Some(install) = graph.get::<InstallIgnition>()
  {
    let json = serde_json::to_vec(&install.config).context("Failed to serialize install ignition")?;
    written.push(write_output(&args.dir, INSTALL_IGNITION_FILE, &json)?);
  }
  if ids.contains(&AssetId::of::<ApplianceDiskImage>())
    && let Some(image) = graph.get::<ApplianceDiskImage>()
    && let Some(layout) = &image.layout
  {
    written.push(write_output(&args.dir, GUESTFISH_SCRIPT_FILE, &image.guestfish_script)?);
    written.push(write_output(&args.dir, USER_CFG_FILE, &image.user_cfg)?);
    let json = serde_json::to_vec_pretty(layout).context("Failed to serialize partition layout")?;
    written.push(write_output(&args.dir, LAYOUT_FILE, &json)?);
  }

  print_success(&format!(
    "Built {} file(s) in {}",
    written.len(),
    format_elapsed(start.elapsed())
  ));
  for (name, size) in &written {
    print_field(name, &format_size(*size));
  }
  Ok(())
}

fn resolve(graph: &mut AssetGraph, ids: &[AssetId]) -> Result<()> {
  for id in ids {
    graph
      .dependency_order(*id)
      .with_context(|| format!("Invalid asset graph for {}", id.short_name()))?;
  }
  for id in ids {
    graph
      .resolve_id(*id)
      .with_context(|| format!("Failed to build {}", id.short_name()))?;
  }
  Ok(())
}

fn write_output(dir: &Path, name: &str, contents: &[u8]) -> Result<(String, u64)> {
  let path = dir.join(name);
  fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
  info!(path = %path.display(), bytes = contents.len(), "wrote asset");
  Ok((name.to_string(), contents.len() as u64))
}

/// The pull secret on disk, readable by the owner only. Removed on drop.
struct PullSecret {
  path: PathBuf,
}

impl PullSecret {
  fn write(temp_dir: &Path, secret: &str) -> Result<Self> {
    let path = temp_dir.join(PULL_SECRET_FILE);
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
      use std::os::unix::fs::OpenOptionsExt;
      options.mode(0o600);
    }

    let mut file = options
      .open(&path)
      .with_context(|| format!("Failed to create {}", path.display()))?;
    // mode only applies when the file is created
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      file
        .set_permissions(fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to restrict {}", path.display()))?;
    }
    file
      .write_all(secret.as_bytes())
      .with_context(|| format!("Failed to write {}", path.display()))?;

    debug!(path = %path.display(), "wrote pull secret");
    Ok(Self { path })
  }
}

impl Drop for PullSecret {
  fn drop(&mut self) {
    if let Err(err) = fs::remove_file(&self.path) {
      warn!(path = %self.path.display(), error = %err, "failed to remove pull secret");
    }
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  #[cfg(unix)]
  #[test]
  fn pull_secret_is_owner_only_and_removed_on_drop() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let stale = temp.path().join(PULL_SECRET_FILE);
    fs::write(&stale, "old").unwrap();
    fs::set_permissions(&stale, fs::Permissions::from_mode(0o644)).unwrap();

    let secret = PullSecret::write(temp.path(), r#"{"auths":{}}"#).unwrap();
    let meta = fs::metadata(&secret.path).unwrap();
    assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    assert_eq!(fs::read_to_string(&secret.path).unwrap(), r#"{"auths":{}}"#);

    drop(secret);
    assert!(!stale.exists());
  }
}
