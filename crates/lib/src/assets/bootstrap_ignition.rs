use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use super::add_core_user;
use super::base_iso::BaseIso;
use super::install_ignition::InstallIgnition;
use super::manifests::ExtraManifests;
use crate::asset::{Asset, AssetId, GenerateError, Parents};
use crate::config::{ApplianceConfig, EnvConfig};
use crate::consts::{
  DEFAULT_OWNER, EXTRA_MANIFEST_PATH, IGNITION_VERSION, REGISTRY_DATA_BOOTSTRAP, REGISTRY_ENV_PATH, SCRIPTS_BIN_PATH,
};
use crate::ignition::{Config, Document, IgnitionError, expand_extra_manifests};
use crate::templates::data::{bootstrap_ignition_data, registry_env};
use crate::templates::{TEMPLATE_SUFFIX, TemplateSource};

const SCRIPT_MODE: u32 = 0o755;

/// Units and scripts that make up one ignition phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPlan {
  /// Template sets whose units are added, in order. Later sets override earlier ones.
  pub unit_sets: Vec<&'static str>,
  /// Units to enable.
  pub services: Vec<&'static str>,
  /// Scripts rendered from `scripts/bin` into the scripts directory.
  pub scripts: Vec<&'static str>,
}

impl UnitPlan {
  /// Units and scripts for the bootstrap phase.
  ///
  /// With `debug_bootstrap`, `ironic-agent.service` is enabled too, which keeps the
  /// machine from rebooting so the install ignition can be inspected.
  pub fn bootstrap(debug_bootstrap: bool) -> Self {
    let mut services = vec![
      "start-local-registry.service",
      "assisted-service.service",
      "create-cluster-and-infraenv.service",
      "pre-install.service",
      "pre-install-node-zero.service",
      "update-hosts.service",
    ];
    if debug_bootstrap {
      services.push("ironic-agent.service");
    }

    Self {
      unit_sets: vec!["services/common", "services/bootstrap"],
      services,
      scripts: vec![
        "setup-local-registry.sh",
        "set-env-files.sh",
        "pre-install.sh",
        "pre-install-node-zero.sh",
        "release-image-download.sh",
        "release-image.sh",
        "update-hosts.sh",
        "create-virtual-device.sh",
        "get-container-images.sh",
      ],
    }
  }

  /// Units and scripts for the install phase.
  pub fn install() -> Self {
    Self {
      unit_sets: vec!["services/common", "services/install"],
      services: vec![
        "start-local-registry.service",
        "update-hosts.service",
        "apply-extra-manifests.service",
      ],
      scripts: vec!["setup-local-registry.sh", "update-hosts.sh"],
    }
  }

  /// Add this plan's units and scripts to `doc`.
  pub fn apply(&self, doc: &mut Document, templates: &dyn TemplateSource, data: &Value) -> Result<(), IgnitionError> {
    for set in &self.unit_sets {
      doc.add_systemd_units(templates, set, data, &self.services)?;
    }
    for script in &self.scripts {
      doc.add_storage_file(
        templates,
        &format!("{SCRIPTS_BIN_PATH}/{script}"),
        &format!("scripts/bin/{script}{TEMPLATE_SUFFIX}"),
        data,
        DEFAULT_OWNER,
        SCRIPT_MODE,
      )?;
    }
    Ok(())
  }
}

/// Ignition embedded in the recovery ISO; brings up the local registry and assisted-service.
pub struct BootstrapIgnition {
  templates: Rc<dyn TemplateSource>,
  pub config: Config,
}

impl BootstrapIgnition {
  pub fn new(templates: Rc<dyn TemplateSource>) -> Self {
    Self {
      templates,
      config: Config::default(),
    }
  }
}

impl Asset for BootstrapIgnition {
  fn name(&self) -> &'static str {
    "Bootstrap Ignition"
  }

  fn dependencies(&self) -> Vec<AssetId> {
    vec![
      AssetId::of::<EnvConfig>(),
      AssetId::of::<ApplianceConfig>(),
      AssetId::of::<ExtraManifests>(),
      AssetId::of::<InstallIgnition>(),
      AssetId::of::<BaseIso>(),
    ]
  }

  fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
    let env = parents.get::<EnvConfig>()?;
    let config = parents.get::<ApplianceConfig>()?;
    let manifests = parents.get::<ExtraManifests>()?;
    let install = parents.get::<InstallIgnition>()?;
    let base_iso = parents.get::<BaseIso>()?;

    let install_config = serde_json::to_string(&install.config).map_err(|source| GenerateError::Serialize {
      what: "install ignition",
      source,
    })?;
    let data = bootstrap_ignition_data(
      &config.spec.ocp_release,
      config.cpu_architecture(),
      REGISTRY_DATA_BOOTSTRAP,
      config.registry_port(),
      &install_config,
      Some(&base_iso.path),
    );

    let mut doc = Document::new(IGNITION_VERSION);
    UnitPlan::bootstrap(env.debug_bootstrap).apply(&mut doc, self.templates.as_ref(), &data)?;
    add_core_user(&mut doc, config)?;

    let env_file = registry_env(REGISTRY_DATA_BOOTSTRAP);
    doc.add_file_from_string(REGISTRY_ENV_PATH, DEFAULT_OWNER, 0o644, &env_file)?;
    expand_extra_manifests(&mut doc, EXTRA_MANIFEST_PATH, &manifests.files)?;

    self.config = doc.finalize();
    debug!("successfully generated bootstrap ignition");
    Ok(())
  }
}
