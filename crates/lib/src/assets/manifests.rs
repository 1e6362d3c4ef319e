use std::fs;

use tracing::debug;
use walkdir::WalkDir;

use crate::asset::{Asset, AssetId, GenerateError, Parents};
use crate::config::EnvConfig;
use crate::ignition::ManifestFile;

const MANIFEST_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// User manifests found in `<asset dir>/openshift`, sorted by file name.
#[derive(Debug, Clone, Default)]
pub struct ExtraManifests {
  pub files: Vec<ManifestFile>,
}

impl Asset for ExtraManifests {
  fn name(&self) -> &'static str {
    "Extra Manifests"
  }

  fn dependencies(&self) -> Vec<AssetId> {
    vec![AssetId::of::<EnvConfig>()]
  }

  fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError> {
    let env = parents.get::<EnvConfig>()?;
    let dir = env.manifests_dir();
    if !dir.is_dir() {
      debug!(dir = %dir.display(), "no extra manifests directory");
      return Ok(());
    }

    let walker = WalkDir::new(&dir)
      .min_depth(1)
      .max_depth(1)
      .follow_links(true)
      .sort_by_file_name();

    for entry in walker {
      let entry = entry.map_err(|err| GenerateError::Read {
        path: err.path().unwrap_or(&dir).to_path_buf(),
        source: err.into(),
      })?;
      if !entry.file_type().is_file() {
        continue;
      }
      let path = entry.path();
      let is_manifest = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MANIFEST_EXTENSIONS.contains(&ext));
      if !is_manifest {
        continue;
      }

      let data = fs::read(path).map_err(|source| GenerateError::Read {
        path: path.to_path_buf(),
        source,
      })?;
      self.files.push(ManifestFile::new(entry.file_name().to_string_lossy(), data));
    }

    debug!(count = self.files.len(), "collected extra manifests");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;
  use crate::asset::AssetGraph;

  #[test]
  fn collects_manifests_sorted() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("openshift");
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("b.yml"), "kind: B\n").unwrap();
    fs::write(dir.join("a.yaml"), "kind: A\n").unwrap();
    fs::write(dir.join("c.json"), "{}").unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();
    fs::write(dir.join("nested/d.yaml"), "kind: D\n").unwrap();

    let mut graph = AssetGraph::new();
    graph.register(EnvConfig::new(temp.path())).register(ExtraManifests::default());
    let manifests = graph.resolve::<ExtraManifests>().unwrap();

    let names: Vec<_> = manifests.files.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["a.yaml", "b.yml", "c.json"]);
    assert_eq!(manifests.files[0].data, b"kind: A\n");
  }

  #[test]
  fn missing_directory_yields_no_manifests() {
    let temp = TempDir::new().unwrap();
    let mut graph = AssetGraph::new();
    graph.register(EnvConfig::new(temp.path())).register(ExtraManifests::default());

    assert!(graph.resolve::<ExtraManifests>().unwrap().files.is_empty());
  }

  #[cfg(unix)]
  #[test]
  fn unreadable_entry_fails_generation() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("openshift");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("a.yaml"), "kind: A\n").unwrap();
    std::os::unix::fs::symlink(dir.join("missing.yaml"), dir.join("broken.yaml")).unwrap();

    let mut graph = AssetGraph::new();
    graph.register(EnvConfig::new(temp.path())).register(ExtraManifests::default());

    let err = graph.resolve::<ExtraManifests>().map(|_| ()).unwrap_err();
    match err.generate_error() {
      Some(GenerateError::Read { path, .. }) => assert!(path.ends_with("broken.yaml")),
      other => panic!("unexpected error: {other:?}"),
    }
  }
}
