//! The `appliance-config.yaml` model.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ConfigError, DEFAULT_DISK_SIZE_GB, MIN_DISK_SIZE_GB};
use crate::asset::{Asset, AssetId, GenerateError, Parents};
use crate::consts::{OCP_RELEASE_REPOSITORY, REGISTRY_PORT};
use crate::partition::GIB;

/// CPU architecture of the release payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuArchitecture {
  #[default]
  #[serde(rename = "x86_64", alias = "amd64")]
  X86_64,
  #[serde(rename = "aarch64", alias = "arm64")]
  Aarch64,
  #[serde(rename = "ppc64le")]
  Ppc64le,
  #[serde(rename = "s390x")]
  S390x,
}

impl CpuArchitecture {
  /// Name used in CoreOS artifact file names.
  pub fn as_str(self) -> &'static str {
    match self {
      CpuArchitecture::X86_64 => "x86_64",
      CpuArchitecture::Aarch64 => "aarch64",
      CpuArchitecture::Ppc64le => "ppc64le",
      CpuArchitecture::S390x => "s390x",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcpRelease {
  pub version: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub channel: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cpu_architecture: Option<CpuArchitecture>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRegistry {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uri: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub port: Option<u16>,
}

/// The user-facing appliance configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceSpec {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_version: Option<String>,
  pub ocp_release: OcpRelease,
  #[serde(default, rename = "diskSizeGB", skip_serializing_if = "Option::is_none")]
  pub disk_size_gb: Option<u64>,
  pub pull_secret: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ssh_key: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_core_pass: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image_registry: Option<ImageRegistry>,
}

/// Asset wrapping the loaded appliance configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplianceConfig {
  pub spec: ApplianceSpec,
}

impl ApplianceConfig {
  pub fn new(spec: ApplianceSpec) -> Self {
    Self { spec }
  }

  /// Load and validate a configuration file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config = Self::from_yaml(&text)?;
    debug!(path = %path.display(), version = %config.spec.ocp_release.version, "loaded appliance config");
    Ok(config)
  }

  /// Parse and validate a configuration document.
  pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
    let config = Self::new(serde_yaml::from_str(text)?);
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    to_major_minor(&self.spec.ocp_release.version)?;

    if let Some(size_gb) = self.spec.disk_size_gb
      && size_gb < MIN_DISK_SIZE_GB
    {
      return Err(ConfigError::DiskTooSmall {
        size_gb,
        min_gb: MIN_DISK_SIZE_GB,
      });
    }
    self.disk_size_bytes()?;

    serde_json::from_str::<serde_json::Value>(&self.spec.pull_secret).map_err(ConfigError::InvalidPullSecret)?;

    Ok(())
  }

  pub fn cpu_architecture(&self) -> CpuArchitecture {
    self.spec.ocp_release.cpu_architecture.unwrap_or_default()
  }

  pub fn disk_size_gb(&self) -> u64 {
    self.spec.disk_size_gb.unwrap_or(DEFAULT_DISK_SIZE_GB)
  }

  pub fn disk_size_bytes(&self) -> Result<i64, ConfigError> {
    let size_gb = self.disk_size_gb();
    i64::try_from(size_gb)
      .ok()
      .and_then(|gb| gb.checked_mul(GIB))
      .ok_or(ConfigError::DiskTooLarge { size_gb })
  }

  /// Pull spec of the release payload: the configured URL, or the public
  /// `ocp-release` image for the version and architecture.
  pub fn release_image(&self) -> String {
    let release = &self.spec.ocp_release;
    release.url.clone().unwrap_or_else(|| {
      format!(
        "{OCP_RELEASE_REPOSITORY}:{}-{}",
        release.version,
        self.cpu_architecture().as_str()
      )
    })
  }

  pub fn registry_port(&self) -> u16 {
    self
      .spec
      .image_registry
      .as_ref()
      .and_then(|r| r.port)
      .unwrap_or(REGISTRY_PORT)
  }
}

impl Asset for ApplianceConfig {
  fn name(&self) -> &'static str {
    "Appliance Config"
  }

  fn dependencies(&self) -> Vec<AssetId> {
    Vec::new()
  }

  fn generate(&mut self, _parents: &Parents<'_>) -> Result<(), GenerateError> {
    self.validate()?;
    Ok(())
  }
}

/// Reduce a version such as `4.14.3` to `4.14`.
pub fn to_major_minor(version: &str) -> Result<String, ConfigError> {
  let invalid = || ConfigError::InvalidVersion(version.to_string());
  let mut parts = version.split(['.', '-', '+']);
  let major: u64 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
  let minor: u64 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
  Ok(format!("{major}.{minor}"))
}
