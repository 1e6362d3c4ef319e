//! Depth-first asset resolution with memoization.
//!
//! The graph owns every registered asset. Resolving a target walks its
//! dependencies in declaration order, generates each asset once, and stores
//! the outcome (the generated asset or its error) keyed by asset identity.

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, error, info};

use super::types::AssetError;
use super::{Asset, AssetId, Memo, Parents, downcast};

/// Static facts about a registered asset, captured at registration.
struct NodeInfo {
  name: &'static str,
  dependencies: Vec<AssetId>,
}

/// Resolves and memoizes assets for a single run.
#[derive(Default)]
pub struct AssetGraph {
  /// Names and dependency lists of every registered asset.
  nodes: HashMap<AssetId, NodeInfo>,

  /// Registered assets that have not been generated yet.
  pending: HashMap<AssetId, Box<dyn Asset>>,

  /// Generated assets and memoized failures.
  done: Memo,
}

impl AssetGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register the instance that will be generated for asset type `A`.
  ///
  /// Registering the same type twice replaces the earlier instance, as long as
  /// it has not been generated yet.
  pub fn register<A: Asset>(&mut self, asset: A) -> &mut Self {
    let id = AssetId::of::<A>();
    self.nodes.insert(
      id,
      NodeInfo {
        name: asset.name(),
        dependencies: asset.dependencies(),
      },
    );
    if !self.done.contains_key(&id) {
      self.pending.insert(id, Box::new(asset));
    }
    self
  }

  /// Resolve asset `T` and everything it depends on, returning the generated asset.
  ///
  /// # Errors
  ///
  /// - `CyclicDependency` if `T` transitively depends on an asset still being resolved
  /// - `NotRegistered` if a required asset type has no registered instance
  /// - `Generate` if `T` or one of its dependencies failed to generate
  pub fn resolve<T: Asset>(&mut self) -> Result<&T, AssetError> {
    let id = AssetId::of::<T>();
    self.resolve_id(id)?;
    self.get::<T>().ok_or_else(|| AssetError::NotRegistered {
      asset: id.short_name().to_string(),
      required_by: None,
    })
  }

  /// Resolve an asset by identity.
  pub fn resolve_id(&mut self, id: AssetId) -> Result<(), AssetError> {
    let mut stack = Vec::new();
    self.visit(id, &mut stack)
  }

  /// Get an already generated asset.
  pub fn get<T: Asset>(&self) -> Option<&T> {
    match self.done.get(&AssetId::of::<T>()) {
      Some(Ok(asset)) => downcast::<T>(asset.as_ref()),
      _ => None,
    }
  }

  /// Returns true if the asset has been attempted (successfully or not).
  pub fn is_resolved(&self, id: AssetId) -> bool {
    self.done.contains_key(&id)
  }

  fn visit(&mut self, id: AssetId, stack: &mut Vec<(AssetId, &'static str)>) -> Result<(), AssetError> {
    if let Some(outcome) = self.done.get(&id) {
      debug!(asset = %id, "using memoized result");
      return outcome.as_ref().map(|_| ()).map_err(Clone::clone);
    }

    if let Some(pos) = stack.iter().position(|(in_progress, _)| *in_progress == id) {
      let mut cycle: Vec<String> = stack[pos..].iter().map(|(_, name)| name.to_string()).collect();
      cycle.push(stack[pos].1.to_string());
      return Err(AssetError::CyclicDependency { cycle });
    }

    let Some(mut asset) = self.pending.remove(&id) else {
      return Err(AssetError::NotRegistered {
        asset: id.short_name().to_string(),
        required_by: stack.last().map(|(_, name)| name.to_string()),
      });
    };

    let name = asset.name();
    let dependencies = self
      .nodes
      .get(&id)
      .map(|info| info.dependencies.clone())
      .unwrap_or_default();

    debug!(asset = name, dependencies = dependencies.len(), "resolving asset");

    stack.push((id, name));
    let mut failure = None;
    for dep in &dependencies {
      if let Err(err) = self.visit(*dep, stack) {
        failure = Some(err.within(name));
        break;
      }
    }
    stack.pop();

    let outcome = match failure {
      Some(err) => Err(err),
      None => {
        let parents = Parents::new(name, &dependencies, &self.done);
        match asset.generate(&parents) {
          Ok(()) => {
            info!(asset = name, "generated asset");
            Ok(asset)
          }
          Err(e) => {
            error!(asset = name, error = %e, "asset generation failed");
            Err(AssetError::Generate {
              chain: vec![name.to_string()],
              source: Arc::new(e),
            })
          }
        }
      }
    };

    let result = outcome.as_ref().map(|_| ()).map_err(Clone::clone);
    self.done.insert(id, outcome);
    result
  }

  /// Compute the order in which `target` and its dependencies would be generated.
  ///
  /// This only inspects registered dependency lists; nothing is generated.
  /// Dependencies always come before their dependents.
  ///
  /// # Errors
  ///
  /// Returns `NotRegistered` for a missing asset and `CyclicDependency` naming
  /// the members of the first cycle found.
  pub fn dependency_order(&self, target: AssetId) -> Result<Vec<&'static str>, AssetError> {
    let mut graph: DiGraph<AssetId, ()> = DiGraph::new();
    let mut indices: HashMap<AssetId, NodeIndex> = HashMap::new();

    let mut queue = vec![(target, None::<&'static str>)];
    while let Some((id, required_by)) = queue.pop() {
      if indices.contains_key(&id) {
        continue;
      }
      let info = self.nodes.get(&id).ok_or_else(|| AssetError::NotRegistered {
        asset: id.short_name().to_string(),
        required_by: required_by.map(str::to_string),
      })?;
      indices.insert(id, graph.add_node(id));
      queue.extend(info.dependencies.iter().rev().map(|dep| (*dep, Some(info.name))));
    }

    // Edge from dependency to dependent
    for idx in graph.node_indices().collect::<Vec<_>>() {
      let id = graph[idx];
      for dep in &self.nodes[&id].dependencies {
        graph.add_edge(indices[dep], idx, ());
      }
    }

    match toposort(&graph, None) {
      Ok(sorted) => Ok(sorted.into_iter().map(|idx| self.nodes[&graph[idx]].name).collect()),
      Err(_) => {
        let cycle = tarjan_scc(&graph)
          .into_iter()
          .find(|component| component.len() > 1 || graph.contains_edge(component[0], component[0]))
          .unwrap_or_default();
        Err(AssetError::CyclicDependency {
          cycle: cycle.iter().map(|idx| self.nodes[&graph[*idx]].name.to_string()).collect(),
        })
      }
    }
  }
}
