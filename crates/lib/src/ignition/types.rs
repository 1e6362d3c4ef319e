//! Serde model of the ignition 3.2 config subset the appliance emits.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
  pub ignition: Ignition,
  #[serde(default, skip_serializing_if = "Passwd::is_empty")]
  pub passwd: Passwd,
  #[serde(default, skip_serializing_if = "Storage::is_empty")]
  pub storage: Storage,
  #[serde(default, skip_serializing_if = "Systemd::is_empty")]
  pub systemd: Systemd,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ignition {
  pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub directories: Vec<Directory>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub files: Vec<File>,
}

impl Storage {
  pub fn is_empty(&self) -> bool {
    self.directories.is_empty() && self.files.is_empty()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUser {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
  pub path: String,
  #[serde(default)]
  pub user: NodeUser,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub overwrite: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mode: Option<u32>,
  #[serde(default)]
  pub contents: Resource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
  pub path: String,
  #[serde(default)]
  pub user: NodeUser,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub overwrite: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mode: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passwd {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub users: Vec<PasswdUser>,
}

impl Passwd {
  pub fn is_empty(&self) -> bool {
    self.users.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswdUser {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub password_hash: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub ssh_authorized_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Systemd {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub units: Vec<Unit>,
}

impl Systemd {
  pub fn is_empty(&self) -> bool {
    self.units.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub enabled: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub contents: Option<String>,
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn empty_sections_are_omitted() {
    let config = Config {
      ignition: Ignition {
        version: "3.2.0".into(),
      },
      ..Default::default()
    };
    assert_eq!(serde_json::to_value(&config).unwrap(), json!({ "ignition": { "version": "3.2.0" } }));
  }

  #[test]
  fn field_names_match_ignition_schema() {
    let config = Config {
      ignition: Ignition {
        version: "3.2.0".into(),
      },
      passwd: Passwd {
        users: vec![PasswdUser {
          name: "core".into(),
          password_hash: Some("$2b$".into()),
          ssh_authorized_keys: vec!["ssh-ed25519 AAAA".into()],
        }],
      },
      storage: Storage {
        directories: vec![Directory {
          path: "/etc/assisted".into(),
          user: NodeUser {
            name: Some("root".into()),
          },
          overwrite: Some(true),
          mode: Some(0o755),
        }],
        files: vec![],
      },
      systemd: Systemd {
        units: vec![Unit {
          name: "a.service".into(),
          enabled: Some(true),
          contents: None,
        }],
      },
    };

    let value = serde_json::to_value(&config).unwrap();
    assert_eq!(value["passwd"]["users"][0]["passwordHash"], "$2b$");
    assert_eq!(value["passwd"]["users"][0]["sshAuthorizedKeys"][0], "ssh-ed25519 AAAA");
    assert_eq!(value["storage"]["directories"][0]["user"]["name"], "root");
    assert_eq!(value["storage"]["directories"][0]["mode"], 493);
    assert!(value["storage"].get("files").is_none());
    assert_eq!(value["systemd"]["units"][0], json!({ "name": "a.service", "enabled": true }));

    let back: Config = serde_json::from_value(value).unwrap();
    assert_eq!(back, config);
  }
}
