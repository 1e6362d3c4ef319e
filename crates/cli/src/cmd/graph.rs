//! Implementation of the `appliance graph` command.

use anyhow::{Context, Result};

use super::{Setup, SetupArgs, Target};
use crate::output::{print_info, print_step};

pub fn cmd_graph(args: &SetupArgs, target: Target) -> Result<()> {
  let graph = Setup::load(args)?.into_graph(&args.templates, None);

  for id in target.asset_ids() {
    let order = graph
      .dependency_order(id)
      .with_context(|| format!("Invalid asset graph for {}", id.short_name()))?;

    print_info(&format!("{} ({} assets)", id.short_name(), order.len()));
    for (index, name) in order.iter().enumerate() {
      print_step(index + 1, name);
    }
  }
  Ok(())
}
