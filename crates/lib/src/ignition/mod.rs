//! Ignition document assembly.
//!
//! [`Document`] collects systemd units, storage files, directories and passwd
//! users keyed by name or path. Adding an entry whose key already exists
//! replaces it in place, so the final config has one entry per key in
//! first-insertion order.

mod document;
mod manifests;
pub mod types;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

use crate::templates::TemplateError;

pub use document::{Document, FileSource};
pub use manifests::{ManifestFile, decode_multiple, expand_extra_manifests, manifest_path};
pub use types::Config;

/// Highest permission value accepted for files and directories.
pub const MAX_MODE: u32 = 0o7777;

/// Errors that can occur while assembling an ignition document.
#[derive(Debug, Error)]
pub enum IgnitionError {
  #[error("path must be absolute: {0}")]
  RelativePath(String),

  #[error("invalid mode {mode:#o} for {path}")]
  InvalidMode { path: String, mode: u32 },

  #[error("failed to render {target}: {source}")]
  Render {
    target: String,
    #[source]
    source: TemplateError,
  },

  #[error("unit {unit} is not valid UTF-8")]
  InvalidUtf8 { unit: String },

  #[error("could not decode YAML for {filename}: {source}")]
  Decode {
    filename: String,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("could not encode manifest {filename}: {source}")]
  Encode {
    filename: String,
    #[source]
    source: serde_yaml::Error,
  },
}

/// Encode bytes as a `data:` URL for inline file contents.
pub fn data_url(bytes: &[u8]) -> String {
  format!("data:text/plain;charset=utf-8;base64,{}", STANDARD.encode(bytes))
}

/// Decode a `data:` URL produced by [`data_url`]. Returns `None` for any other source.
pub fn decode_data_url(source: &str) -> Option<Vec<u8>> {
  let encoded = source.strip_prefix("data:")?.split_once(";base64,")?.1;
  STANDARD.decode(encoded).ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn data_url_round_trips() {
    let url = data_url(b"REGISTRY_DATA=/mnt\n");
    assert_eq!(url, "data:text/plain;charset=utf-8;base64,UkVHSVNUUllfREFUQT0vbW50Cg==");
    assert_eq!(decode_data_url(&url).unwrap(), b"REGISTRY_DATA=/mnt\n");
  }

  #[test]
  fn decode_rejects_remote_sources() {
    assert!(decode_data_url("https://example.com/file").is_none());
  }
}
