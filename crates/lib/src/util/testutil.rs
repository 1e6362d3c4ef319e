//! Test doubles for the external collaborators assets depend on.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use serde_json::Value;

use crate::release::{Release, ReleaseError};
use crate::templates::{TemplateError, TemplateSource, render_text};

/// Templates held in memory, keyed by their path relative to the template root.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
  files: BTreeMap<String, String>,
}

impl MemoryTemplates {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, name: &str, text: &str) -> Self {
    self.files.insert(name.to_string(), text.to_string());
    self
  }
}

impl TemplateSource for MemoryTemplates {
  fn render(&self, name: &str, data: &Value) -> Result<Vec<u8>, TemplateError> {
    let text = self
      .files
      .get(name)
      .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
    render_text(name, text, data)
  }

  fn list(&self, set: &str) -> Result<Vec<String>, TemplateError> {
    let prefix = format!("{set}/");
    Ok(
      self
        .files
        .keys()
        .filter_map(|key| key.strip_prefix(&prefix))
        .filter(|rest| !rest.contains('/'))
        .map(str::to_string)
        .collect(),
    )
  }
}

/// A template tree covering every template the appliance assets render.
pub fn appliance_templates() -> MemoryTemplates {
  let mut templates = MemoryTemplates::new()
    .with("services/common/start-local-registry.service.template", "Environment=DATA={{.RegistryDataPath}}")
    .with("services/common/update-hosts.service", "[Unit]\nDescription=Update hosts\n")
    .with("services/bootstrap/assisted-service.service", "[Unit]\n")
    .with("services/bootstrap/ironic-agent.service", "[Unit]\n")
    .with("services/bootstrap/update-hosts.service", "[Unit]\nDescription=Bootstrap hosts\n")
    .with("services/install/apply-extra-manifests.service", "[Unit]\n")
    .with(
      "guestfish/guestfish.sh.template",
      concat!(
        "add {{.CoreOSImage}}\n",
        "part-add /dev/sda p {{.RecoveryStartSector}} {{.RecoveryEndSector}}\n",
        "part-add /dev/sda p {{.DataStartSector}} {{.DataEndSector}}\n",
        "part-set-gpt-type /dev/sda 5 {{.ReservedPartitionGUID}}\n",
        "copy-in {{.CfgFile}} /grub2/\n",
      ),
    )
    .with(
      "grub/user.cfg.template",
      concat!(
        "set timeout={{.GrubTimeout}}\n",
        "menuentry '{{.GrubMenuEntryName}}' { search --set=root --label {{.RecoveryPartitionName}} }\n",
      ),
    );

  for script in [
    "setup-local-registry.sh",
    "set-env-files.sh",
    "pre-install.sh",
    "pre-install-node-zero.sh",
    "release-image-download.sh",
    "release-image.sh",
    "update-hosts.sh",
    "create-virtual-device.sh",
    "get-container-images.sh",
  ] {
    templates = templates.with(
      &format!("scripts/bin/{script}.template"),
      "#!/bin/sh\nbootstrap={{.IsBootstrapStep}} registry={{.RegistryDomain}}\n",
    );
  }
  templates
}

/// A [`Release`] that records calls and returns a fixed extraction result.
#[derive(Debug, Clone, Default)]
pub struct StubRelease {
  extracted: Option<PathBuf>,
  calls: Rc<RefCell<Vec<String>>>,
}

impl StubRelease {
  /// A release whose `extract_file` always returns `path`.
  pub fn extracting(path: impl Into<PathBuf>) -> Self {
    Self {
      extracted: Some(path.into()),
      calls: Rc::default(),
    }
  }

  /// A release whose `extract_file` always fails.
  pub fn failing() -> Self {
    Self::default()
  }

  /// Shared handle to the recorded calls, formatted as `method(args)`.
  pub fn calls(&self) -> Rc<RefCell<Vec<String>>> {
    Rc::clone(&self.calls)
  }
}

impl Release for StubRelease {
  fn extract_file(&self, image: &str, filename: &str) -> Result<PathBuf, ReleaseError> {
    self.calls.borrow_mut().push(format!("extract_file({image}, {filename})"));
    self
      .extracted
      .clone()
      .ok_or_else(|| ReleaseError::ImageNotFound(image.to_string()))
  }

  fn image_from_release(&self, name: &str) -> Result<String, ReleaseError> {
    self.calls.borrow_mut().push(format!("image_from_release({name})"));
    Ok(format!("quay.io/stub/{name}:latest"))
  }
}
