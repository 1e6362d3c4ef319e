//! Run configuration supplied to the asset graph.
//!
//! Both configuration types are leaf assets: the CLI builds them once per run
//! and registers them, and every other asset reads them through its parents.
//! - `EnvConfig`: where assets are written and which debug switches are on
//! - `ApplianceConfig`: the user's `appliance-config.yaml`

mod appliance;
mod env;

use std::path::PathBuf;

use thiserror::Error;

pub use appliance::{ApplianceConfig, ApplianceSpec, CpuArchitecture, ImageRegistry, OcpRelease, to_major_minor};
pub use env::EnvConfig;

/// Default appliance disk size when the config does not set one.
pub const DEFAULT_DISK_SIZE_GB: u64 = 200;

/// Smallest disk the appliance can be built for.
pub const MIN_DISK_SIZE_GB: u64 = 150;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse appliance config: {0}")]
  Parse(#[from] serde_yaml::Error),

  #[error("invalid OCP release version '{0}': expected major.minor[.patch]")]
  InvalidVersion(String),

  #[error("disk size {size_gb}GiB is below the minimum of {min_gb}GiB")]
  DiskTooSmall { size_gb: u64, min_gb: u64 },

  #[error("disk size {size_gb}GiB does not fit in a 64-bit byte count")]
  DiskTooLarge { size_gb: u64 },

  #[error("pull secret is not valid JSON: {0}")]
  InvalidPullSecret(#[source] serde_json::Error),

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}
