use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use super::base_iso::BaseIso;
use super::bootstrap_ignition::BootstrapIgnition;
use crate::asset::{Asset, AssetId, GenerateError, Parents};
use crate::config::{ApplianceConfig, EnvConfig};
use crate::consts::{APPLIANCE_IMAGE_FILE, DATA_ISO_FILE, GRUB_MENU_ENTRY_NAME, RECOVERY_ISO_FILE, USER_CFG_FILE};
use crate::partition::{LayoutRequest, PartitionLayout, calculate};
use crate::templates::TemplateSource;
use crate::templates::data::{GuestfishFiles, guestfish_data, user_cfg_data};

const GUESTFISH_TEMPLATE: &str = "guestfish/guestfish.sh.template";
const USER_CFG_TEMPLATE: &str = "grub/user.cfg.template";

/// An ISO built by an external tool into the temp directory.
fn built_iso(env: &EnvConfig, file_name: &str) -> Result<(PathBuf, i64), GenerateError> {
  let path = env.temp_dir.join(file_name);
  let metadata = fs::metadata(&path).map_err(|source| GenerateError::Read {
    path: path.clone(),
    source,
  })?;
  debug!(path = %path.display(), size = metadata.len(), "found built ISO");
  Ok((path, metadata.len() as i64))
}

/// The recovery ISO: the base ISO with the bootstrap ignition embedded.
#[derive(Debug, Clone, Default)]
pub struct RecoveryIso {
  pub path: PathBuf,
  pub size_bytes: i64,
}

impl Asset for RecoveryIso {
  fn name(&self) -> &'static str {
    "Recovery ISO"
  }

  fn dependencies(&self) -> Vec<AssetId> {
    vec![AssetId::of::<EnvConfig>(), AssetId::of::<BootstrapIgnition>()]
  }

  fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
    let env = parents.get::<EnvConfig>()?;
    (self.path, self.size_bytes) = built_iso(env, RECOVERY_ISO_FILE)?;
    Ok(())
  }
}

/// The data ISO holding the mirrored release images.
#[derive(Debug, Clone, Default)]
pub struct DataIso {
  pub path: PathBuf,
  pub size_bytes: i64,
}

impl Asset for DataIso {
  fn name(&self) -> &'static str {
    "Data ISO"
  }

  fn dependencies(&self) -> Vec<AssetId> {
    vec![AssetId::of::<EnvConfig>()]
  }

  fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
    let env = parents.get::<EnvConfig>()?;
    (self.path, self.size_bytes) = built_iso(env, DATA_ISO_FILE)?;
    Ok(())
  }
}

/// The partition layout and the scripts that write the appliance disk image.
pub struct ApplianceDiskImage {
  templates: Rc<dyn TemplateSource>,
  pub layout: Option<PartitionLayout>,
  pub guestfish_script: Vec<u8>,
  pub user_cfg: Vec<u8>,
}

impl ApplianceDiskImage {
  pub fn new(templates: Rc<dyn TemplateSource>) -> Self {
    Self {
      templates,
      layout: None,
      guestfish_script: Vec::new(),
      user_cfg: Vec::new(),
    }
  }
}

impl Asset for ApplianceDiskImage {
  fn name(&self) -> &'static str {
    "Appliance Disk Image"
  }

  fn dependencies(&self) -> Vec<AssetId> {
    vec![
      AssetId::of::<EnvConfig>(),
      AssetId::of::<ApplianceConfig>(),
      AssetId::of::<BaseIso>(),
      AssetId::of::<RecoveryIso>(),
      AssetId::of::<DataIso>(),
    ]
  }

  fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
    let env = parents.get::<EnvConfig>()?;
    let config = parents.get::<ApplianceConfig>()?;
    let base_iso = parents.get::<BaseIso>()?;
    let recovery = parents.get::<RecoveryIso>()?;
    let data = parents.get::<DataIso>()?;

    let request = LayoutRequest::new(config.disk_size_bytes()?, recovery.size_bytes, data.size_bytes);
    let layout = calculate(&request)?;
    layout.validate()?;

    let files = GuestfishFiles {
      base_image: base_disk_image(&base_iso.path).display().to_string(),
      appliance_image: env.asset_dir.join(APPLIANCE_IMAGE_FILE).display().to_string(),
      recovery_iso: recovery.path.display().to_string(),
      data_iso: data.path.display().to_string(),
      cfg_file: env.asset_dir.join(USER_CFG_FILE).display().to_string(),
    };
    self.guestfish_script = self
      .templates
      .render(GUESTFISH_TEMPLATE, &guestfish_data(&layout, config.disk_size_gb(), &files)?)?;
    self.user_cfg = self
      .templates
      .render(USER_CFG_TEMPLATE, &user_cfg_data(GRUB_MENU_ENTRY_NAME, 0))?;

    info!(
      disk_size_gb = config.disk_size_gb(),
      partitions = layout.partitions.len(),
      "computed appliance disk layout"
    );
    self.layout = Some(layout);
    Ok(())
  }
}

/// The CoreOS disk image that sits next to the base ISO in the cache.
fn base_disk_image(base_iso: &Path) -> PathBuf {
  base_iso.with_extension("qcow2")
}
