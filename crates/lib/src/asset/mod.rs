//! Typed build steps and their dependency graph.
//!
//! An [`Asset`] is identified by its Rust type. It declares the asset types it
//! depends on and knows how to generate itself once those are available. The
//! [`AssetGraph`] owns one instance of every registered asset and resolves a
//! requested target depth-first, generating each asset at most once per run.
//!
//! ```ignore
//! let mut graph = AssetGraph::new();
//! graph.register(env_config).register(appliance_config).register(InstallIgnition::new(templates));
//! let install = graph.resolve::<InstallIgnition>()?;
//! ```

mod graph;
mod types;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

pub use graph::AssetGraph;
pub use types::{AssetError, GenerateError};

/// Helper supertrait giving every asset access to `&dyn Any` for downcasting.
pub trait AsAny: Any {
  fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
  fn as_any(&self) -> &dyn Any {
    self
  }
}

/// A unit of build work.
///
/// `generate` stores its output in the asset itself; dependents read it back
/// through [`Parents::get`].
pub trait Asset: AsAny {
  /// Human-friendly name, used in logs and error chains.
  fn name(&self) -> &'static str;

  /// Asset types that must be generated before this one, in resolution order.
  fn dependencies(&self) -> Vec<AssetId>;

  /// Produce this asset's output from its resolved dependencies.
  fn generate(&mut self, parents: &Parents<'_>) -> Result<(), GenerateError>;
}

/// Stable identity of an asset type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId {
  type_id: TypeId,
  type_name: &'static str,
}

impl AssetId {
  pub fn of<T: Asset>() -> Self {
    Self {
      type_id: TypeId::of::<T>(),
      type_name: std::any::type_name::<T>(),
    }
  }

  /// The type name without its module path.
  pub fn short_name(&self) -> &'static str {
    self.type_name.rsplit("::").next().unwrap_or(self.type_name)
  }
}

impl fmt::Display for AssetId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.short_name())
  }
}

pub(crate) type Memo = HashMap<AssetId, Result<Box<dyn Asset>, AssetError>>;

/// Read access to the generated dependencies of the asset being generated.
pub struct Parents<'a> {
  asset: &'static str,
  declared: &'a [AssetId],
  resolved: &'a Memo,
}

impl<'a> Parents<'a> {
  pub(crate) fn new(asset: &'static str, declared: &'a [AssetId], resolved: &'a Memo) -> Self {
    Self {
      asset,
      declared,
      resolved,
    }
  }

  /// Get a generated parent by type.
  ///
  /// # Errors
  ///
  /// Returns `MissingParent` if `T` is not among the declared dependencies.
  pub fn get<T: Asset>(&self) -> Result<&'a T, GenerateError> {
    let id = AssetId::of::<T>();
    let missing = || GenerateError::MissingParent {
      asset: self.asset,
      parent: id.short_name(),
    };

    if !self.declared.contains(&id) {
      return Err(missing());
    }

    match self.resolved.get(&id) {
      Some(Ok(asset)) => downcast::<T>(asset.as_ref()).ok_or_else(missing),
      _ => Err(missing()),
    }
  }
}

pub(crate) fn downcast<T: Asset>(asset: &dyn Asset) -> Option<&T> {
  asset.as_any().downcast_ref::<T>()
}
