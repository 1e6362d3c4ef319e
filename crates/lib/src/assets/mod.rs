//! Concrete appliance assets.
//!
//! ```text
//! EnvConfig ─┬─ ExtraManifests ───────────────┐
//!            ├─ BaseIso ──────────────────────┼─ BootstrapIgnition ─ RecoveryIso ─┐
//! ApplianceConfig ─ InstallIgnition ──────────┘                                   ├─ ApplianceDiskImage
//!            └─ DataIso ──────────────────────────────────────────────────────────┘
//! ```

mod base_iso;
mod bootstrap_ignition;
mod disk_image;
mod install_ignition;
mod manifests;

use std::rc::Rc;

use crate::asset::{AssetGraph, GenerateError};
use crate::config::{ApplianceConfig, EnvConfig};
use crate::consts::{CORE_PASS_OVERRIDE_PATH, DEFAULT_OWNER};
use crate::ignition::Document;
use crate::release::Release;
use crate::templates::TemplateSource;

pub use base_iso::BaseIso;
pub use bootstrap_ignition::{BootstrapIgnition, UnitPlan};
pub use disk_image::{ApplianceDiskImage, DataIso, RecoveryIso};
pub use install_ignition::InstallIgnition;
pub use manifests::ExtraManifests;

const CORE_USER: &str = "core";

/// Register every appliance asset with `graph`.
pub fn register_all(
  graph: &mut AssetGraph,
  env: EnvConfig,
  config: ApplianceConfig,
  templates: Rc<dyn TemplateSource>,
  release: Box<dyn Release>,
) {
  graph
    .register(env)
    .register(config)
    .register(ExtraManifests::default())
    .register(BaseIso::new(release))
    .register(InstallIgnition::new(Rc::clone(&templates)))
    .register(BootstrapIgnition::new(Rc::clone(&templates)))
    .register(RecoveryIso::default())
    .register(DataIso::default())
    .register(ApplianceDiskImage::new(templates));
}

/// Add the `core` user with the configured password and ssh key.
///
/// Setting a password also drops a marker file so the installer keeps it.
fn add_core_user(doc: &mut Document, config: &ApplianceConfig) -> Result<(), GenerateError> {
  let mut password_hash = None;
  if let Some(password) = &config.spec.user_core_pass {
    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|source| GenerateError::PasswordHash {
      user: CORE_USER.to_string(),
      source,
    })?;
    password_hash = Some(hash);
    doc.add_file_from_string(CORE_PASS_OVERRIDE_PATH, DEFAULT_OWNER, 0o644, "")?;
  }

  let ssh_keys = config.spec.ssh_key.as_ref().map(|key| vec![key.clone()]);
  doc.add_password_user(CORE_USER, password_hash, ssh_keys);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::consts::IGNITION_VERSION;

  fn config(extra: &str) -> ApplianceConfig {
    ApplianceConfig::from_yaml(&format!("ocpRelease:\n  version: 4.14.3\npullSecret: '{{}}'\n{extra}")).unwrap()
  }

  #[test]
  fn core_user_with_password_and_key() {
    let mut doc = Document::new(IGNITION_VERSION);
    add_core_user(&mut doc, &config("userCorePass: secret\nsshKey: ssh-ed25519 AAAA\n")).unwrap();

    let user = doc.user("core").unwrap();
    let hash = user.password_hash.as_deref().unwrap();
    assert!(bcrypt::verify("secret", hash).unwrap());
    assert_eq!(user.ssh_authorized_keys, vec!["ssh-ed25519 AAAA"]);
    assert!(doc.file(CORE_PASS_OVERRIDE_PATH).is_some());
  }

  #[test]
  fn core_user_without_credentials() {
    let mut doc = Document::new(IGNITION_VERSION);
    add_core_user(&mut doc, &config("")).unwrap();

    let user = doc.user("core").unwrap();
    assert!(user.password_hash.is_none());
    assert!(user.ssh_authorized_keys.is_empty());
    assert!(doc.file(CORE_PASS_OVERRIDE_PATH).is_none());
  }
}
