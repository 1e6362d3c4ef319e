//! Error types for asset resolution and generation.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::config::ConfigError;
use crate::ignition::IgnitionError;
use crate::partition::LayoutError;
use crate::release::ReleaseError;
use crate::templates::TemplateError;

/// Errors returned by [`AssetGraph::resolve`](super::AssetGraph::resolve).
///
/// The error is `Clone` because failures are memoized: resolving a failed
/// asset a second time replays the stored error instead of generating again.
#[derive(Debug, Clone, Error)]
pub enum AssetError {
  /// An asset (transitively) depends on itself.
  #[error("cyclic dependency: {}", cycle.join(" -> "))]
  CyclicDependency { cycle: Vec<String> },

  /// A dependency was declared but no instance of it was registered.
  #[error("asset {asset} is not registered (required by {})", required_by.as_deref().unwrap_or("<root>"))]
  NotRegistered {
    asset: String,
    required_by: Option<String>,
  },

  /// An asset's generation failed. `chain` lists the assets that were being
  /// resolved, outermost first, ending with the asset that failed.
  #[error("failed to generate {}: {source}", chain.join(" -> "))]
  Generate {
    chain: Vec<String>,
    #[source]
    source: Arc<GenerateError>,
  },
}

impl AssetError {
  /// Returns true for errors in how the graph was put together (cycles,
  /// missing registrations) as opposed to a failing generation step.
  pub fn is_configuration(&self) -> bool {
    matches!(
      self,
      AssetError::CyclicDependency { .. } | AssetError::NotRegistered { .. }
    )
  }

  /// The failing asset's own error, if this is a generation failure.
  pub fn generate_error(&self) -> Option<&GenerateError> {
    match self {
      AssetError::Generate { source, .. } => Some(source),
      _ => None,
    }
  }

  /// Record that `dependent` was resolving this error's asset.
  pub(crate) fn within(self, dependent: &str) -> Self {
    match self {
      AssetError::Generate { mut chain, source } => {
        chain.insert(0, dependent.to_string());
        AssetError::Generate { chain, source }
      }
      other => other,
    }
  }
}

/// Errors raised from inside an asset's `generate`.
#[derive(Debug, Error)]
pub enum GenerateError {
  /// The asset asked for a parent it did not declare, or one that has not been generated.
  #[error("{asset} requested undeclared parent {parent}")]
  MissingParent { asset: &'static str, parent: &'static str },

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Ignition(#[from] IgnitionError),

  #[error(transparent)]
  Template(#[from] TemplateError),

  #[error(transparent)]
  Layout(#[from] LayoutError),

  #[error(transparent)]
  Release(#[from] ReleaseError),

  #[error("failed to serialize {what}: {source}")]
  Serialize {
    what: &'static str,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to hash password for user {user}: {source}")]
  PasswordHash {
    user: String,
    #[source]
    source: bcrypt::BcryptError,
  },

  #[error("failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  fn generate_error(chain: &[&str]) -> AssetError {
    AssetError::Generate {
      chain: chain.iter().map(|s| s.to_string()).collect(),
      source: Arc::new(GenerateError::MissingParent {
        asset: "child",
        parent: "EnvConfig",
      }),
    }
  }

  #[test]
  fn within_prepends_dependent_to_chain() {
    let err = generate_error(&["child"]).within("parent").within("root");
    match err {
      AssetError::Generate { chain, .. } => assert_eq!(chain, vec!["root", "parent", "child"]),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn within_leaves_configuration_errors_alone() {
    let err = AssetError::CyclicDependency {
      cycle: vec!["a".into(), "b".into(), "a".into()],
    }
    .within("root");
    assert_eq!(err.to_string(), "cyclic dependency: a -> b -> a");
    assert!(err.is_configuration());
  }

  #[test]
  fn generate_display_includes_chain_and_source() {
    let err = generate_error(&["root", "child"]);
    assert!(!err.is_configuration());
    assert_eq!(
      err.to_string(),
      "failed to generate root -> child: child requested undeclared parent EnvConfig"
    );
  }

  #[test]
  fn not_registered_display() {
    let err = AssetError::NotRegistered {
      asset: "DataIso".into(),
      required_by: Some("Appliance disk image".into()),
    };
    assert_eq!(
      err.to_string(),
      "asset DataIso is not registered (required by Appliance disk image)"
    );
  }
}
