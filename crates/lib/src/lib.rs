//! appliance-lib: Core types and logic for building an appliance disk image
//!
//! This crate provides the building blocks used by the `appliance` CLI:
//! - `asset`: typed build steps and the graph that resolves them exactly once
//! - `ignition`: assembly of ignition documents (units, files, users)
//! - `partition`: sector arithmetic for the appliance disk layout
//! - `templates`: template sources and the data tables handed to them
//! - `release`: access to files and images in the release payload
//! - `assets`: the concrete ignition and disk-image assets

pub mod asset;
pub mod assets;
pub mod config;
pub mod consts;
pub mod ignition;
pub mod partition;
pub mod release;
pub mod templates;

#[cfg(test)]
mod util;
