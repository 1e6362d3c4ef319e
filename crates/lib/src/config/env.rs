//! Build environment: output locations and debug switches.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::ConfigError;
use crate::asset::{Asset, AssetId, GenerateError, Parents};

/// Where a run reads cached inputs and writes its artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
  pub asset_dir: PathBuf,
  pub cache_dir: PathBuf,
  pub temp_dir: PathBuf,

  /// Keep the machine from rebooting after bootstrap so the install ignition can be debugged.
  pub debug_bootstrap: bool,
}

impl EnvConfig {
  pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
    let asset_dir = asset_dir.into();
    Self {
      cache_dir: asset_dir.join("cache"),
      temp_dir: asset_dir.join("temp"),
      asset_dir,
      debug_bootstrap: false,
    }
  }

  pub fn with_debug_bootstrap(mut self, enabled: bool) -> Self {
    self.debug_bootstrap = enabled;
    self
  }

  /// Returns the path of `file_name` in the cache directory if it exists.
  pub fn find_in_cache(&self, file_name: &str) -> Option<PathBuf> {
    let path = self.cache_dir.join(file_name);
    path.is_file().then_some(path)
  }

  /// Directory holding user-supplied extra manifests.
  pub fn manifests_dir(&self) -> PathBuf {
    self.asset_dir.join("openshift")
  }
}

impl Asset for EnvConfig {
  fn name(&self) -> &'static str {
    "Env Config"
  }

  fn dependencies(&self) -> Vec<AssetId> {
    Vec::new()
  }

  fn generate(&mut self, _parents: &Parents<'_>) -> Result<(), GenerateError> {
    for dir in [&self.cache_dir, &self.temp_dir] {
      create_dir(dir)?;
    }
    debug!(asset_dir = %self.asset_dir.display(), "prepared build directories");
    Ok(())
  }
}

fn create_dir(path: &Path) -> Result<(), ConfigError> {
  fs::create_dir_all(path).map_err(|source| ConfigError::CreateDir {
    path: path.to_path_buf(),
    source,
  })
}
