use std::rc::Rc;

use tracing::debug;

use super::add_core_user;
use super::bootstrap_ignition::UnitPlan;
use crate::asset::{Asset, AssetId, GenerateError, Parents};
use crate::config::ApplianceConfig;
use crate::consts::{DEFAULT_OWNER, IGNITION_VERSION, REGISTRY_DATA_INSTALL, REGISTRY_ENV_PATH};
use crate::ignition::{Config, Document};
use crate::templates::TemplateSource;
use crate::templates::data::{install_ignition_data, registry_env};

/// Ignition applied when the appliance boots into the installation phase.
pub struct InstallIgnition {
  templates: Rc<dyn TemplateSource>,
  pub config: Config,
}

impl InstallIgnition {
  pub fn new(templates: Rc<dyn TemplateSource>) -> Self {
    Self {
      templates,
      config: Config::default(),
    }
  }
}

impl Asset for InstallIgnition {
  fn name(&self) -> &'static str {
    "Install Ignition"
  }

  fn dependencies(&self) -> Vec<AssetId> {
    vec![AssetId::of::<ApplianceConfig>()]
  }

  fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
    let config = parents.get::<ApplianceConfig>()?;
    let plan = UnitPlan::install();
    let data = install_ignition_data(REGISTRY_DATA_INSTALL, config.registry_port());

    let mut doc = Document::new(IGNITION_VERSION);
    plan.apply(&mut doc, self.templates.as_ref(), &data)?;
    add_core_user(&mut doc, config)?;
    let env_file = registry_env(REGISTRY_DATA_INSTALL);
    doc.add_file_from_string(REGISTRY_ENV_PATH, DEFAULT_OWNER, 0o644, &env_file)?;

    self.config = doc.finalize();
    debug!("successfully generated install ignition");
    Ok(())
  }
}
