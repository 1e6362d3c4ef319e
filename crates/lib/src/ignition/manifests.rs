//! Splitting multi-document manifest bundles into ignition storage files.

use serde::Deserialize;
use serde_yaml::Value;

use super::{Document, FileSource, IgnitionError};

const MANIFEST_OWNER: &str = "root";
const MANIFEST_FILE_MODE: u32 = 0o644;
const MANIFEST_DIR_MODE: u32 = 0o755;

/// A user-supplied manifest bundle, possibly holding several YAML documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
  pub filename: String,
  pub data: Vec<u8>,
}

impl ManifestFile {
  pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
    Self {
      filename: filename.into(),
      data: data.into(),
    }
  }
}

/// Decode every document in a `---` separated YAML stream, skipping empty ones.
pub fn decode_multiple(data: &[u8]) -> Result<Vec<Value>, serde_yaml::Error> {
  let mut documents = Vec::new();
  for document in serde_yaml::Deserializer::from_slice(data) {
    let value = Value::deserialize(document)?;
    if !value.is_null() {
      documents.push(value);
    }
  }
  Ok(documents)
}

/// Target path of document `index` of `filename` inside `dir`:
/// `<dir>/<stem>-<index><ext>`.
pub fn manifest_path(dir: &str, filename: &str, index: usize) -> String {
  let base = filename.rsplit('/').next().unwrap_or(filename);
  let (stem, ext) = match base.rfind('.') {
    Some(dot) => base.split_at(dot),
    None => (base, ""),
  };
  format!("{}/{stem}-{index}{ext}", dir.trim_end_matches('/'))
}

/// Add `dir` and one file per decoded document of every bundle in `files`.
///
/// Nothing is added to `doc` unless every bundle decodes.
pub fn expand_extra_manifests(doc: &mut Document, dir: &str, files: &[ManifestFile]) -> Result<(), IgnitionError> {
  let mut staged = Vec::new();
  for file in files {
    let documents = decode_multiple(&file.data).map_err(|source| IgnitionError::Decode {
      filename: file.filename.clone(),
      source,
    })?;

    for (index, document) in documents.iter().enumerate() {
      let encoded = serde_yaml::to_string(document).map_err(|source| IgnitionError::Encode {
        filename: file.filename.clone(),
        source,
      })?;
      staged.push((manifest_path(dir, &file.filename, index), encoded.into_bytes()));
    }
  }

  doc.add_directory(dir, MANIFEST_OWNER, MANIFEST_DIR_MODE)?;
  for (path, bytes) in staged {
    doc.add_file(&path, MANIFEST_OWNER, MANIFEST_FILE_MODE, FileSource::Inline(bytes))?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  const DIR: &str = "/etc/assisted/extra-manifests";

  #[test]
  fn two_document_bundle_expands_to_indexed_files() {
    let bundle = ManifestFile::new(
      "openshift/foo.yaml",
      concat!(
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: one\n",
        "---\n",
        "apiVersion: v1\nkind: Secret\nmetadata:\n  name: two\n",
      ),
    );
    let mut doc = Document::new("3.2.0");

    expand_extra_manifests(&mut doc, DIR, &[bundle]).unwrap();

    let paths: Vec<_> = doc.files().map(|f| f.path.clone()).collect();
    assert_eq!(
      paths,
      vec![
        "/etc/assisted/extra-manifests/foo-0.yaml",
        "/etc/assisted/extra-manifests/foo-1.yaml"
      ]
    );

    let first: Value = serde_yaml::from_slice(&doc.file_contents(&paths[0]).unwrap()).unwrap();
    let second: Value = serde_yaml::from_slice(&doc.file_contents(&paths[1]).unwrap()).unwrap();
    assert_eq!(first["kind"], "ConfigMap");
    assert_eq!(second["kind"], "Secret");
    assert_eq!(second["metadata"]["name"], "two");

    let file = doc.file(&paths[0]).unwrap();
    assert_eq!(file.user.name.as_deref(), Some("root"));
    assert_eq!(file.mode, Some(MANIFEST_FILE_MODE));

    let dir = doc.directory(DIR).unwrap();
    assert_eq!(dir.overwrite, Some(true));
  }

  #[test]
  fn malformed_bundle_adds_nothing() {
    let good = ManifestFile::new("good.yaml", "kind: ConfigMap\n");
    let bad = ManifestFile::new("bad.yaml", "kind: [unclosed\n");
    let mut doc = Document::new("3.2.0");

    let err = expand_extra_manifests(&mut doc, DIR, &[good, bad]).unwrap_err();

    assert!(matches!(err, IgnitionError::Decode { ref filename, .. } if filename == "bad.yaml"));
    assert_eq!(doc.files().count(), 0);
    assert!(doc.directory(DIR).is_none());
  }

  #[test]
  fn json_manifests_keep_extension() {
    let bundle = ManifestFile::new("cm.json", r#"{"kind": "ConfigMap"}"#);
    let mut doc = Document::new("3.2.0");

    expand_extra_manifests(&mut doc, DIR, &[bundle]).unwrap();
    assert!(doc.file("/etc/assisted/extra-manifests/cm-0.json").is_some());
  }

  #[test]
  fn empty_documents_are_skipped() {
    let docs = decode_multiple(b"---\nkind: A\n---\n---\nkind: B\n").unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1]["kind"], "B");
  }

  #[test]
  fn manifest_path_variants() {
    assert_eq!(manifest_path(DIR, "foo.yaml", 0), format!("{DIR}/foo-0.yaml"));
    assert_eq!(manifest_path("/x/", "a/b/c.tar.yml", 2), "/x/c.tar-2.yml");
    assert_eq!(manifest_path("/x", "noext", 1), "/x/noext-1");
  }
}
