//! Template sources for ignition payloads and disk-image scripts.
//!
//! Assets never read template files themselves. They receive a
//! [`TemplateSource`] and ask it to render a named template with a JSON data
//! table built by the functions in [`data`].
//!
//! The production source is [`DirTemplates`], a directory tree such as:
//!
//! ```text
//! data/
//! ├── services/
//! │   ├── common/start-local-registry.service.template
//! │   └── bootstrap/...
//! ├── scripts/bin/setup-local-registry.sh.template
//! └── guestfish/guestfish.sh.template
//! ```

pub mod data;
pub mod placeholder;

use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub use placeholder::PlaceholderError;

/// Suffix carried by template files; stripped from rendered names.
pub const TEMPLATE_SUFFIX: &str = ".template";

/// Errors that can occur when loading or rendering templates.
#[derive(Debug, Error)]
pub enum TemplateError {
  #[error("template not found: {0}")]
  NotFound(String),

  #[error("failed to read template {name}: {source}")]
  Read {
    name: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to list template set {set}: {source}")]
  List {
    set: String,
    #[source]
    source: std::io::Error,
  },

  #[error("template {name} is not valid UTF-8")]
  InvalidUtf8 { name: String },

  #[error("failed to render template {name}: {source}")]
  Render {
    name: String,
    #[source]
    source: PlaceholderError,
  },
}

/// A provider of named templates.
pub trait TemplateSource {
  /// Render the template `name` (relative to the source root) with `data`.
  fn render(&self, name: &str, data: &Value) -> Result<Vec<u8>, TemplateError>;

  /// List the template file names in `set`, sorted.
  fn list(&self, set: &str) -> Result<Vec<String>, TemplateError>;
}

/// Strip the template suffix from a file name.
pub fn rendered_name(file_name: &str) -> &str {
  file_name.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(file_name)
}

/// Render template text, attributing failures to `name`.
pub fn render_text(name: &str, text: &str, data: &Value) -> Result<Vec<u8>, TemplateError> {
  placeholder::substitute(text, data)
    .map(String::into_bytes)
    .map_err(|source| TemplateError::Render {
      name: name.to_string(),
      source,
    })
}

/// Templates read from a directory tree on disk.
#[derive(Debug, Clone)]
pub struct DirTemplates {
  root: PathBuf,
}

impl DirTemplates {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }
}

impl TemplateSource for DirTemplates {
  fn render(&self, name: &str, data: &Value) -> Result<Vec<u8>, TemplateError> {
    let path = self.root.join(name);
    debug!(template = name, path = %path.display(), "rendering template");

    let bytes = fs::read(&path).map_err(|source| match source.kind() {
      std::io::ErrorKind::NotFound => TemplateError::NotFound(name.to_string()),
      _ => TemplateError::Read {
        name: name.to_string(),
        source,
      },
    })?;
    let text = String::from_utf8(bytes).map_err(|_| TemplateError::InvalidUtf8 { name: name.to_string() })?;

    render_text(name, &text, data)
  }

  fn list(&self, set: &str) -> Result<Vec<String>, TemplateError> {
    let dir = self.root.join(set);
    let entries = fs::read_dir(&dir).map_err(|source| TemplateError::List {
      set: set.to_string(),
      source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
      let entry = entry.map_err(|source| TemplateError::List {
        set: set.to_string(),
        source,
      })?;
      if entry.path().is_file() {
        names.push(entry.file_name().to_string_lossy().to_string());
      }
    }
    names.sort();
    Ok(names)
  }
}
