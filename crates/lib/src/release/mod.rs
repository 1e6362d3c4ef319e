//! Access to the OpenShift release payload.
//!
//! Assets that need files from release images receive a [`Release`] when they
//! are constructed. [`OcRelease`] is the production implementation and shells
//! out to `oc`.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

/// Errors from release payload operations.
#[derive(Debug, Error)]
pub enum ReleaseError {
  #[error("failed to run {binary}: {source}")]
  Spawn {
    binary: String,
    #[source]
    source: std::io::Error,
  },

  #[error("command failed with exit code {code:?}: {command}: {stderr}")]
  CommandFailed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("image {0} not found in release")]
  ImageNotFound(String),

  #[error("extracted file {} does not exist", .0.display())]
  MissingFile(PathBuf),
}

/// Operations on a release payload.
pub trait Release {
  /// Extract `filename` from the release component `image` into a local path.
  fn extract_file(&self, image: &str, filename: &str) -> Result<PathBuf, ReleaseError>;

  /// Resolve the pull spec of the release component `name`.
  fn image_from_release(&self, name: &str) -> Result<String, ReleaseError>;
}

/// [`Release`] backed by the `oc` CLI.
#[derive(Debug, Clone)]
pub struct OcRelease {
  binary: PathBuf,
  release_image: String,
  registry_config: Option<PathBuf>,
  cache_dir: PathBuf,
}

impl OcRelease {
  pub fn new(release_image: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
    Self {
      binary: PathBuf::from("oc"),
      release_image: release_image.into(),
      registry_config: None,
      cache_dir: cache_dir.into(),
    }
  }

  /// Use `path` as the registry auth file for every `oc` call.
  pub fn with_registry_config(mut self, path: impl Into<PathBuf>) -> Self {
    self.registry_config = Some(path.into());
    self
  }

  pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
    self.binary = binary.into();
    self
  }

  pub fn release_image(&self) -> &str {
    &self.release_image
  }

  fn run(&self, args: &[String]) -> Result<String, ReleaseError> {
    let mut command = Command::new(&self.binary);
    command.args(args);
    if let Some(config) = &self.registry_config {
      command.arg(format!("--registry-config={}", config.display()));
    }

    let rendered = format!("{} {}", self.binary.display(), args.join(" "));
    debug!(command = %rendered, "running oc");

    let output = command.output().map_err(|source| ReleaseError::Spawn {
      binary: self.binary.display().to_string(),
      source,
    })?;

    if !output.status.success() {
      return Err(ReleaseError::CommandFailed {
        command: rendered,
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }
}

impl Release for OcRelease {
  fn extract_file(&self, image: &str, filename: &str) -> Result<PathBuf, ReleaseError> {
    let pull_spec = self.image_from_release(image)?;
    let file = filename.trim_start_matches('/');
    info!(image, file, "extracting file from release image");

    self.run(&[
      "image".to_string(),
      "extract".to_string(),
      format!("--path=/{file}:{}", self.cache_dir.display()),
      "--confirm".to_string(),
      pull_spec,
    ])?;

    let extracted = self.cache_dir.join(file_name(file));
    if !extracted.is_file() {
      return Err(ReleaseError::MissingFile(extracted));
    }
    Ok(extracted)
  }

  fn image_from_release(&self, name: &str) -> Result<String, ReleaseError> {
    let image = self.run(&[
      "adm".to_string(),
      "release".to_string(),
      "info".to_string(),
      format!("--image-for={name}"),
      "--insecure=true".to_string(),
      self.release_image.clone(),
    ])?;
    if image.is_empty() {
      return Err(ReleaseError::ImageNotFound(name.to_string()));
    }
    debug!(name, image = %image, "resolved release image");
    Ok(image)
  }
}

fn file_name(path: &str) -> &str {
  Path::new(path).file_name().and_then(|n| n.to_str()).unwrap_or(path)
}
