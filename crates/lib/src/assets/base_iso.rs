use std::path::PathBuf;

use tracing::{debug, info};

use crate::asset::{Asset, AssetId, GenerateError, Parents};
use crate::config::{ApplianceConfig, EnvConfig};
use crate::consts::MACHINE_OS_IMAGE_NAME;
use crate::release::Release;

/// The CoreOS live ISO for the configured architecture.
///
/// Taken from the cache when present, otherwise extracted from the release payload.
pub struct BaseIso {
  release: Box<dyn Release>,
  pub path: PathBuf,
}

impl BaseIso {
  pub fn new(release: Box<dyn Release>) -> Self {
    Self {
      release,
      path: PathBuf::new(),
    }
  }
}

impl Asset for BaseIso {
  fn name(&self) -> &'static str {
    "Base ISO"
  }

  fn dependencies(&self) -> Vec<AssetId> {
    vec![AssetId::of::<EnvConfig>(), AssetId::of::<ApplianceConfig>()]
  }

  fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
    let env = parents.get::<EnvConfig>()?;
    let config = parents.get::<ApplianceConfig>()?;

    let file_name = format!("coreos-{}.iso", config.cpu_architecture().as_str());
    if let Some(cached) = env.find_in_cache(&file_name) {
      debug!(path = %cached.display(), "using cached base ISO");
      self.path = cached;
      return Ok(());
    }

    info!(file = %file_name, "extracting base ISO from release payload");
    self.path = self
      .release
      .extract_file(MACHINE_OS_IMAGE_NAME, &format!("coreos/{file_name}"))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::TempDir;

  use super::*;
  use crate::asset::AssetGraph;
  use crate::release::ReleaseError;
  use crate::util::testutil::StubRelease;

  fn graph(temp: &TempDir, release: StubRelease) -> AssetGraph {
    let config = ApplianceConfig::from_yaml(
      "ocpRelease:\n  version: 4.14.3\n  cpuArchitecture: aarch64\npullSecret: '{}'\n",
    )
    .unwrap();
    let mut graph = AssetGraph::new();
    graph
      .register(EnvConfig::new(temp.path()))
      .register(config)
      .register(BaseIso::new(Box::new(release)));
    graph
  }

  #[test]
  fn extracts_from_release_when_not_cached() {
    let temp = TempDir::new().unwrap();
    let release = StubRelease::extracting("/cache/coreos-aarch64.iso");
    let calls = release.calls();

    let mut graph = graph(&temp, release);
    let iso = graph.resolve::<BaseIso>().unwrap();

    assert_eq!(iso.path, PathBuf::from("/cache/coreos-aarch64.iso"));
    assert_eq!(
      *calls.borrow(),
      vec!["extract_file(machine-os-images, coreos/coreos-aarch64.iso)"]
    );
  }

  #[test]
  fn prefers_cached_iso() {
    let temp = TempDir::new().unwrap();
    let cached = temp.path().join("cache/coreos-aarch64.iso");
    fs::create_dir_all(cached.parent().unwrap()).unwrap();
    fs::write(&cached, b"iso").unwrap();

    let release = StubRelease::failing();
    let calls = release.calls();
    let mut graph = graph(&temp, release);

    assert_eq!(graph.resolve::<BaseIso>().unwrap().path, cached);
    assert!(calls.borrow().is_empty());
  }

  #[test]
  fn release_failure_is_generation_error() {
    let temp = TempDir::new().unwrap();
    let mut graph = graph(&temp, StubRelease::failing());

    let err = graph.resolve::<BaseIso>().map(|_| ()).unwrap_err();
    assert!(matches!(
      err.generate_error(),
      Some(GenerateError::Release(ReleaseError::ImageNotFound(_)))
    ));
  }
}
