use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use super::types::{Config, Directory, File, Ignition, NodeUser, Passwd, PasswdUser, Resource, Storage, Systemd, Unit};
use super::{IgnitionError, MAX_MODE, data_url, decode_data_url};
use crate::templates::{TemplateSource, rendered_name};

/// Where a storage file's contents come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
  /// Bytes embedded in the config as a `data:` URL.
  Inline(Vec<u8>),
  /// A URL ignition fetches at boot.
  Remote(String),
}

/// An ignition config under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
  version: String,
  units: IndexMap<String, Unit>,
  files: IndexMap<String, File>,
  directories: IndexMap<String, Directory>,
  users: IndexMap<String, PasswdUser>,
}

impl Document {
  pub fn new(version: impl Into<String>) -> Self {
    Self {
      version: version.into(),
      units: IndexMap::new(),
      files: IndexMap::new(),
      directories: IndexMap::new(),
      users: IndexMap::new(),
    }
  }

  /// Add every unit template in `set`, rendered with `data`.
  ///
  /// Unit names are the template file names without the `.template` suffix.
  /// Units whose name appears in `enabled` are marked enabled.
  pub fn add_systemd_units(
    &mut self,
    source: &dyn TemplateSource,
    set: &str,
    data: &Value,
    enabled: &[&str],
  ) -> Result<(), IgnitionError> {
    let files = source.list(set).map_err(|source| IgnitionError::Render {
      target: set.to_string(),
      source,
    })?;

    for file in files {
      let name = rendered_name(&file).to_string();
      let bytes = source
        .render(&format!("{set}/{file}"), data)
        .map_err(|source| IgnitionError::Render {
          target: name.clone(),
          source,
        })?;
      let contents = String::from_utf8(bytes).map_err(|_| IgnitionError::InvalidUtf8 { unit: name.clone() })?;
      let enabled = enabled.contains(&name.as_str()).then_some(true);

      self.add_unit(Unit {
        name,
        enabled,
        contents: Some(contents),
      });
    }
    Ok(())
  }

  /// Add a unit, replacing any unit of the same name in place.
  pub fn add_unit(&mut self, unit: Unit) {
    if self.units.contains_key(&unit.name) {
      debug!(unit = %unit.name, "replacing systemd unit");
    }
    self.units.insert(unit.name.clone(), unit);
  }

  /// Render `template` with `data` and add it as a file at `path`.
  pub fn add_storage_file(
    &mut self,
    source: &dyn TemplateSource,
    path: &str,
    template: &str,
    data: &Value,
    owner: &str,
    mode: u32,
  ) -> Result<(), IgnitionError> {
    check_node(path, mode)?;
    let bytes = source.render(template, data).map_err(|source| IgnitionError::Render {
      target: path.to_string(),
      source,
    })?;
    self.add_file(path, owner, mode, FileSource::Inline(bytes))
  }

  /// Add a file, replacing any file at the same path in place.
  pub fn add_file(&mut self, path: &str, owner: &str, mode: u32, contents: FileSource) -> Result<(), IgnitionError> {
    check_node(path, mode)?;
    let source = match contents {
      FileSource::Inline(bytes) => data_url(&bytes),
      FileSource::Remote(url) => url,
    };

    if self.files.contains_key(path) {
      debug!(path, "replacing storage file");
    }
    self.files.insert(
      path.to_string(),
      File {
        path: path.to_string(),
        user: owned_by(owner),
        overwrite: Some(true),
        mode: Some(mode),
        contents: Resource { source: Some(source) },
      },
    );
    Ok(())
  }

  pub fn add_file_from_string(
    &mut self,
    path: &str,
    owner: &str,
    mode: u32,
    contents: &str,
  ) -> Result<(), IgnitionError> {
    self.add_file(path, owner, mode, FileSource::Inline(contents.as_bytes().to_vec()))
  }

  /// Add a directory that ignition recreates rather than merges.
  pub fn add_directory(&mut self, path: &str, owner: &str, mode: u32) -> Result<(), IgnitionError> {
    check_node(path, mode)?;
    self.directories.insert(
      path.to_string(),
      Directory {
        path: path.to_string(),
        user: owned_by(owner),
        overwrite: Some(true),
        mode: Some(mode),
      },
    );
    Ok(())
  }

  /// Insert or update a passwd user.
  ///
  /// On update, only the credentials that are `Some` replace the existing ones.
  pub fn add_password_user(&mut self, name: &str, password_hash: Option<String>, ssh_keys: Option<Vec<String>>) {
    let user = self.users.entry(name.to_string()).or_insert_with(|| PasswdUser {
      name: name.to_string(),
      password_hash: None,
      ssh_authorized_keys: Vec::new(),
    });
    if password_hash.is_some() {
      user.password_hash = password_hash;
    }
    if let Some(keys) = ssh_keys {
      user.ssh_authorized_keys = keys;
    }
  }

  pub fn unit(&self, name: &str) -> Option<&Unit> {
    self.units.get(name)
  }

  pub fn units(&self) -> impl Iterator<Item = &Unit> {
    self.units.values()
  }

  pub fn file(&self, path: &str) -> Option<&File> {
    self.files.get(path)
  }

  pub fn files(&self) -> impl Iterator<Item = &File> {
    self.files.values()
  }

  /// Decoded contents of an inline file.
  pub fn file_contents(&self, path: &str) -> Option<Vec<u8>> {
    let source = self.files.get(path)?.contents.source.as_deref()?;
    decode_data_url(source)
  }

  pub fn directory(&self, path: &str) -> Option<&Directory> {
    self.directories.get(path)
  }

  pub fn user(&self, name: &str) -> Option<&PasswdUser> {
    self.users.get(name)
  }

  /// Convert into a serializable ignition config.
  pub fn finalize(self) -> Config {
    Config {
      ignition: Ignition { version: self.version },
      passwd: Passwd {
        users: self.users.into_values().collect(),
      },
      storage: Storage {
        directories: self.directories.into_values().collect(),
        files: self.files.into_values().collect(),
      },
      systemd: Systemd {
        units: self.units.into_values().collect(),
      },
    }
  }
}

fn owned_by(owner: &str) -> NodeUser {
  NodeUser {
    name: Some(owner.to_string()),
  }
}

fn check_node(path: &str, mode: u32) -> Result<(), IgnitionError> {
  if !path.starts_with('/') {
    return Err(IgnitionError::RelativePath(path.to_string()));
  }
  if mode > MAX_MODE {
    return Err(IgnitionError::InvalidMode {
      path: path.to_string(),
      mode,
    });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::templates::TemplateError;
  use crate::util::testutil::MemoryTemplates;

  fn unit(name: &str, contents: &str) -> Unit {
    Unit {
      name: name.to_string(),
      enabled: None,
      contents: Some(contents.to_string()),
    }
  }

  #[test]
  fn unit_replaced_in_place() {
    let mut doc = Document::new("3.2.0");
    doc.add_unit(unit("a.service", "first"));
    doc.add_unit(unit("b.service", "b"));
    doc.add_unit(unit("a.service", "second"));

    let config = doc.finalize();
    let names: Vec<_> = config.systemd.units.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["a.service", "b.service"]);
    assert_eq!(config.systemd.units[0].contents.as_deref(), Some("second"));
  }

  #[test]
  fn systemd_units_from_template_set() {
    let templates = MemoryTemplates::new()
      .with("services/common/a.service.template", "ExecStart={{.Cmd}}")
      .with("services/common/b.service", "[Unit]")
      .with("services/other/c.service", "[Unit]");

    let mut doc = Document::new("3.2.0");
    doc
      .add_systemd_units(&templates, "services/common", &json!({ "Cmd": "/bin/true" }), &["a.service"])
      .unwrap();

    let a = doc.unit("a.service").unwrap();
    assert_eq!(a.enabled, Some(true));
    assert_eq!(a.contents.as_deref(), Some("ExecStart=/bin/true"));
    assert_eq!(doc.unit("b.service").unwrap().enabled, None);
    assert!(doc.unit("c.service").is_none());
  }

  #[test]
  fn later_unit_set_overrides_earlier() {
    let templates = MemoryTemplates::new()
      .with("services/common/a.service", "common")
      .with("services/common/z.service", "z")
      .with("services/bootstrap/a.service", "bootstrap");

    let mut doc = Document::new("3.2.0");
    doc.add_systemd_units(&templates, "services/common", &json!({}), &[]).unwrap();
    doc.add_systemd_units(&templates, "services/bootstrap", &json!({}), &[]).unwrap();

    let units: Vec<_> = doc.units().map(|u| (u.name.as_str(), u.contents.as_deref())).collect();
    assert_eq!(units, vec![("a.service", Some("bootstrap")), ("z.service", Some("z"))]);
  }

  #[test]
  fn unit_render_error_names_unit() {
    let templates = MemoryTemplates::new().with("services/common/a.service.template", "{{.Missing}}");
    let mut doc = Document::new("3.2.0");

    let err = doc
      .add_systemd_units(&templates, "services/common", &json!({}), &[])
      .unwrap_err();
    match err {
      IgnitionError::Render { target, source } => {
        assert_eq!(target, "a.service");
        assert!(matches!(source, TemplateError::Render { .. }));
      }
      other => panic!("unexpected error: {other}"),
    }
    assert_eq!(doc.units().count(), 0);
  }

  #[test]
  fn storage_file_rendered_and_replaced_by_path() {
    let templates = MemoryTemplates::new().with("scripts/bin/run.sh.template", "echo {{.Msg}}");
    let mut doc = Document::new("3.2.0");

    doc
      .add_storage_file(
        &templates,
        "/usr/local/bin/run.sh",
        "scripts/bin/run.sh.template",
        &json!({ "Msg": "one" }),
        "root",
        0o755,
      )
      .unwrap();
    doc.add_file_from_string("/etc/other", "root", 0o644, "x").unwrap();
    doc
      .add_storage_file(
        &templates,
        "/usr/local/bin/run.sh",
        "scripts/bin/run.sh.template",
        &json!({ "Msg": "two" }),
        "root",
        0o700,
      )
      .unwrap();

    assert_eq!(doc.file_contents("/usr/local/bin/run.sh").unwrap(), b"echo two");
    let file = doc.file("/usr/local/bin/run.sh").unwrap();
    assert_eq!(file.mode, Some(0o700));
    assert_eq!(file.user.name.as_deref(), Some("root"));
    assert_eq!(file.overwrite, Some(true));

    let paths: Vec<_> = doc.files().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["/usr/local/bin/run.sh", "/etc/other"]);
  }

  #[test]
  fn storage_file_missing_template_names_path() {
    let templates = MemoryTemplates::new();
    let mut doc = Document::new("3.2.0");

    let err = doc
      .add_storage_file(
        &templates,
        "/usr/local/bin/x.sh",
        "scripts/bin/x.sh.template",
        &json!({}),
        "root",
        0o755,
      )
      .unwrap_err();
    assert_eq!(
      err.to_string(),
      "failed to render /usr/local/bin/x.sh: template not found: scripts/bin/x.sh.template"
    );
  }

  #[test]
  fn remote_file_source_kept_verbatim() {
    let mut doc = Document::new("3.2.0");
    doc
      .add_file("/opt/payload", "root", 0o600, FileSource::Remote("https://example.com/p".into()))
      .unwrap();
    assert_eq!(
      doc.file("/opt/payload").unwrap().contents.source.as_deref(),
      Some("https://example.com/p")
    );
    assert!(doc.file_contents("/opt/payload").is_none());
  }

  #[test]
  fn rejects_relative_paths_and_bad_modes() {
    let mut doc = Document::new("3.2.0");
    assert!(matches!(
      doc.add_file_from_string("etc/x", "root", 0o644, ""),
      Err(IgnitionError::RelativePath(_))
    ));
    assert!(matches!(
      doc.add_directory("/etc/x", "root", 0o17777),
      Err(IgnitionError::InvalidMode { mode: 0o17777, .. })
    ));
    assert!(doc.finalize().storage.is_empty());
  }

  #[test]
  fn directories_unique_by_path() {
    let mut doc = Document::new("3.2.0");
    doc.add_directory("/etc/assisted/extra-manifests", "root", 0o755).unwrap();
    doc.add_directory("/etc/assisted/extra-manifests", "core", 0o700).unwrap();

    let config = doc.finalize();
    assert_eq!(config.storage.directories.len(), 1);
    let dir = &config.storage.directories[0];
    assert_eq!(dir.user.name.as_deref(), Some("core"));
    assert_eq!(dir.overwrite, Some(true));
  }

  #[test]
  fn password_user_updates_merge() {
    let mut doc = Document::new("3.2.0");
    doc.add_password_user("core", Some("hash1".into()), None);
    doc.add_password_user("core", None, Some(vec!["ssh-ed25519 AAAA".into()]));
    doc.add_password_user("core", Some("hash2".into()), None);

    let user = doc.user("core").unwrap();
    assert_eq!(user.password_hash.as_deref(), Some("hash2"));
    assert_eq!(user.ssh_authorized_keys, vec!["ssh-ed25519 AAAA"]);
    assert_eq!(doc.finalize().passwd.users.len(), 1);
  }

  #[test]
  fn finalize_carries_version() {
    let config = Document::new("3.2.0").finalize();
    assert_eq!(config.ignition.version, "3.2.0");
  }
}
