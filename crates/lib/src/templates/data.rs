//! Data tables handed to templates.
//!
//! Keys are the placeholder names used in the template tree, so they keep the
//! `UpperCamel` spelling of the templates rather than Rust naming.

use std::path::Path;

use serde_json::{Value, json};

use crate::config::{CpuArchitecture, OcpRelease};
use crate::consts::{
  DATA_PARTITION_NAME, GRUB_TIMEOUT, RECOVERY_PARTITION_NAME, REGISTRY_DOMAIN, REGISTRY_FILE_PATH, REGISTRY_IMAGE,
  RESERVED_PARTITION_GUID,
};
use crate::partition::{LayoutError, PartitionLayout};

/// Registry fields shared by the bootstrap and install data.
fn registry_fields(data: &mut Value, registry_data_path: &str, registry_port: u16) {
  data["RegistryDataPath"] = json!(registry_data_path);
  data["RegistryDomain"] = json!(REGISTRY_DOMAIN);
  data["RegistryPort"] = json!(registry_port);
  data["RegistryFilePath"] = json!(REGISTRY_FILE_PATH);
  data["RegistryImage"] = json!(REGISTRY_IMAGE);
}

/// Data for bootstrap scripts and units.
///
/// `ReleaseImages` and `OsImages` are JSON strings in the format assisted-service reads from its environment.
pub fn bootstrap_ignition_data(
  release: &OcpRelease,
  arch: CpuArchitecture,
  registry_data_path: &str,
  registry_port: u16,
  install_ignition_config: &str,
  coreos_image_path: Option<&Path>,
) -> Value {
  let release_images = json!([{
    "openshift_version": release.version,
    "version": release.version,
    "cpu_architecture": arch.as_str(),
    "url": release.url,
  }]);
  let os_images = json!([{
    "openshift_version": release.version,
    "cpu_architecture": arch.as_str(),
    "version": "n/a",
    "url": "n/a",
  }]);

  let mut data = json!({
    "IsBootstrapStep": true,
    "InstallIgnitionConfig": install_ignition_config,
    "ReleaseImages": release_images.to_string(),
    "ReleaseImage": release.url.as_deref().unwrap_or_default(),
    "OsImages": os_images.to_string(),
    "CoreosImagePath": coreos_image_path.map(|p| p.display().to_string()).unwrap_or_default(),
  });
  registry_fields(&mut data, registry_data_path, registry_port);
  data
}

/// Data for install scripts and units.
pub fn install_ignition_data(registry_data_path: &str, registry_port: u16) -> Value {
  let mut data = json!({ "IsBootstrapStep": false });
  registry_fields(&mut data, registry_data_path, registry_port);
  data
}

/// File names referenced by the guestfish script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestfishFiles {
  pub base_image: String,
  pub appliance_image: String,
  pub recovery_iso: String,
  pub data_iso: String,
  pub cfg_file: String,
}

/// Data for the guestfish script that writes the appliance disk image.
pub fn guestfish_data(
  layout: &PartitionLayout,
  disk_size_gb: u64,
  files: &GuestfishFiles,
) -> Result<Value, LayoutError> {
  let recovery = layout
    .recovery()
    .ok_or_else(|| LayoutError::MissingPartition(RECOVERY_PARTITION_NAME.to_string()))?;
  let data = layout
    .data()
    .ok_or_else(|| LayoutError::MissingPartition(DATA_PARTITION_NAME.to_string()))?;

  Ok(json!({
    "ApplianceFile": files.appliance_image,
    "RecoveryIsoFile": files.recovery_iso,
    "DataIsoFile": files.data_iso,
    "CoreOSImage": files.base_image,
    "CfgFile": files.cfg_file,
    "DiskSize": disk_size_gb,
    "RecoveryStartSector": recovery.start_sector,
    "RecoveryEndSector": recovery.end_sector,
    "DataStartSector": data.start_sector,
    "DataEndSector": data.end_sector,
    "RecoveryPartitionName": RECOVERY_PARTITION_NAME,
    "DataPartitionName": DATA_PARTITION_NAME,
    "ReservedPartitionGUID": RESERVED_PARTITION_GUID,
  }))
}

/// Data for the grub `user.cfg` that adds the recovery boot entry.
pub fn user_cfg_data(menu_entry_name: &str, grub_default: u32) -> Value {
  json!({
    "GrubTimeout": GRUB_TIMEOUT,
    "GrubDefault": grub_default,
    "GrubMenuEntryName": menu_entry_name,
    "RecoveryPartitionName": RECOVERY_PARTITION_NAME,
  })
}

/// Contents of `registry.env`, read by the registry units.
pub fn registry_env(registry_data_path: &str) -> String {
  format!("REGISTRY_IMAGE={REGISTRY_IMAGE}\nREGISTRY_DATA={registry_data_path}\n")
}
