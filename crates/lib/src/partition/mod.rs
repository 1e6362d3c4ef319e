//! Sector arithmetic for the appliance disk image.
//!
//! The recovery and data partitions are placed at the end of the disk, after
//! whatever partitions the base CoreOS image brings. The layout is computed
//! backward from the end of the disk:
//!
//! ```text
//! | base image partitions ... | recovery | data | 1 MiB backup GPT margin |
//!                             ^          ^      ^
//!               recovery_start  data_start  data_end
//! ```
//!
//! All arithmetic uses 512-byte sectors and truncating division.

mod layout;

use thiserror::Error;
use tracing::debug;

use crate::consts::{DATA_PARTITION_NAME, RECOVERY_PARTITION_NAME, RESERVED_PARTITION_GUID};

pub use layout::{Partition, PartitionLayout};

pub const SECTOR_SIZE: i64 = 512;
pub const MIB: i64 = 1024 * 1024;
pub const GIB: i64 = 1024 * MIB;

/// Space left free at the end of the disk for the backup GPT.
pub const TRAILING_MARGIN_BYTES: i64 = MIB;

/// ext4 needs more room than the raw ISO payload (inode tables and other metadata).
pub const EXT4_OVERHEAD_FACTOR: f64 = 1.1;

/// Errors produced while computing or validating a layout.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
  #[error("{what} must not be negative (got {value})")]
  NegativeSize { what: &'static str, value: i64 },

  #[error("overhead factor must be a finite value >= 1.0 (got {0})")]
  InvalidOverhead(f64),

  #[error(
    "disk of {disk_size_bytes} bytes is too small: {partition} partition would start at sector {start_sector}"
  )]
  DiskTooSmall {
    disk_size_bytes: i64,
    partition: String,
    start_sector: i64,
  },

  #[error("partition {partition} ends before it starts ({start_sector} > {end_sector})")]
  InvertedPartition {
    partition: String,
    start_sector: i64,
    end_sector: i64,
  },

  #[error("layout has no {0} partition")]
  MissingPartition(String),

  #[error("partitions {first} and {second} overlap")]
  Overlap { first: String, second: String },

  #[error("partition {partition} ends at sector {end_sector}, past the last usable sector {last_usable}")]
  PastEnd {
    partition: String,
    end_sector: i64,
    last_usable: i64,
  },
}

/// Inputs to the layout calculation, all in bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutRequest {
  pub disk_size_bytes: i64,
  pub recovery_image_size_bytes: i64,
  pub data_partition_size_bytes: i64,
  pub overhead_factor: f64,
}

impl LayoutRequest {
  pub fn new(disk_size_bytes: i64, recovery_image_size_bytes: i64, data_partition_size_bytes: i64) -> Self {
    Self {
      disk_size_bytes,
      recovery_image_size_bytes,
      data_partition_size_bytes,
      overhead_factor: EXT4_OVERHEAD_FACTOR,
    }
  }

  pub fn with_overhead_factor(mut self, factor: f64) -> Self {
    self.overhead_factor = factor;
    self
  }

  /// Size of the recovery partition: the image size scaled by the overhead factor, truncated.
  pub fn recovery_partition_size_bytes(&self) -> i64 {
    (self.recovery_image_size_bytes as f64 * self.overhead_factor) as i64
  }

  fn check(&self) -> Result<(), LayoutError> {
    for (what, value) in [
      ("disk size", self.disk_size_bytes),
      ("recovery image size", self.recovery_image_size_bytes),
      ("data partition size", self.data_partition_size_bytes),
    ] {
      if value < 0 {
        return Err(LayoutError::NegativeSize { what, value });
      }
    }
    if !self.overhead_factor.is_finite() || self.overhead_factor < 1.0 {
      return Err(LayoutError::InvalidOverhead(self.overhead_factor));
    }
    Ok(())
  }
}

/// Compute the recovery and data partition boundaries for `request`.
///
/// # Errors
///
/// Returns `DiskTooSmall` if any computed start sector would be negative.
pub fn calculate(request: &LayoutRequest) -> Result<PartitionLayout, LayoutError> {
  request.check()?;

  let too_small = |partition: &str, start_sector: i64| LayoutError::DiskTooSmall {
    disk_size_bytes: request.disk_size_bytes,
    partition: partition.to_string(),
    start_sector,
  };

  let data_end = (request.disk_size_bytes - TRAILING_MARGIN_BYTES) / SECTOR_SIZE;
  let data_start = data_end - request.data_partition_size_bytes / SECTOR_SIZE;
  if data_end < 0 || data_start < 0 {
    return Err(too_small(DATA_PARTITION_NAME, data_start));
  }

  let recovery_size = request.recovery_partition_size_bytes();
  let recovery_end = data_start - 1;
  let recovery_start = recovery_end - recovery_size / SECTOR_SIZE;
  if recovery_end < 0 || recovery_start < 0 {
    return Err(too_small(RECOVERY_PARTITION_NAME, recovery_start));
  }

  debug!(
    recovery_start,
    recovery_end, data_start, data_end, "computed partition layout"
  );

  Ok(PartitionLayout {
    sector_size: SECTOR_SIZE,
    total_sectors: request.disk_size_bytes / SECTOR_SIZE,
    partitions: vec![
      Partition {
        name: RECOVERY_PARTITION_NAME.to_string(),
        start_sector: recovery_start,
        end_sector: recovery_end,
        type_guid: None,
      },
      Partition {
        name: DATA_PARTITION_NAME.to_string(),
        start_sector: data_start,
        end_sector: data_end,
        type_guid: Some(RESERVED_PARTITION_GUID.to_string()),
      },
    ],
  })
}
