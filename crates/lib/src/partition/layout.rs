use serde::{Deserialize, Serialize};

use super::{LayoutError, SECTOR_SIZE, TRAILING_MARGIN_BYTES};
use crate::consts::{DATA_PARTITION_NAME, RECOVERY_PARTITION_NAME};

/// A single partition in sector units. Both ends are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
  pub name: String,
  pub start_sector: i64,
  pub end_sector: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub type_guid: Option<String>,
}

impl Partition {
  pub fn size_sectors(&self) -> i64 {
    self.end_sector - self.start_sector + 1
  }

  pub fn size_bytes(&self) -> i64 {
    self.size_sectors() * SECTOR_SIZE
  }
}

/// The partitions appended to the base image, ordered by start sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionLayout {
  pub sector_size: i64,
  pub total_sectors: i64,
  pub partitions: Vec<Partition>,
}

impl PartitionLayout {
  pub fn partition(&self, name: &str) -> Option<&Partition> {
    self.partitions.iter().find(|p| p.name == name)
  }

  pub fn recovery(&self) -> Option<&Partition> {
    self.partition(RECOVERY_PARTITION_NAME)
  }

  pub fn data(&self) -> Option<&Partition> {
    self.partition(DATA_PARTITION_NAME)
  }

  /// Last sector a partition may occupy, leaving room for the backup GPT.
  pub fn last_usable_sector(&self) -> i64 {
    self.total_sectors - TRAILING_MARGIN_BYTES / self.sector_size
  }

  /// Check that partitions are well-formed, ordered, disjoint and fit the disk.
  pub fn validate(&self) -> Result<(), LayoutError> {
    for p in &self.partitions {
      if p.start_sector < 0 {
        return Err(LayoutError::DiskTooSmall {
          disk_size_bytes: self.total_sectors * self.sector_size,
          partition: p.name.clone(),
          start_sector: p.start_sector,
        });
      }
      if p.start_sector > p.end_sector {
        return Err(LayoutError::InvertedPartition {
          partition: p.name.clone(),
          start_sector: p.start_sector,
          end_sector: p.end_sector,
        });
      }
      if p.end_sector > self.last_usable_sector() {
        return Err(LayoutError::PastEnd {
          partition: p.name.clone(),
          end_sector: p.end_sector,
          last_usable: self.last_usable_sector(),
        });
      }
    }

    let mut by_start: Vec<&Partition> = self.partitions.iter().collect();
    by_start.sort_by_key(|p| p.start_sector);
    for pair in by_start.windows(2) {
      if pair[0].end_sector >= pair[1].start_sector {
        return Err(LayoutError::Overlap {
          first: pair[0].name.clone(),
          second: pair[1].name.clone(),
        });
      }
    }

    Ok(())
  }
}
