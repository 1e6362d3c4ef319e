//! Implementation of the `appliance layout` command.
//!
//! Computes where the recovery and data partitions land on a disk of the
//! given size without building any images.

use anyhow::{Context, Result};
use serde::Serialize;

use appliance_lib::partition::{GIB, LayoutRequest, Partition, PartitionLayout, calculate};

use crate::output::{OutputFormat, format_size, print_field, print_info, print_json};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutReport<'a> {
  disk_size_bytes: i64,
  recovery_partition_size_bytes: i64,
  #[serde(flatten)]
  layout: &'a PartitionLayout,
}

pub fn cmd_layout(
  disk_size_gb: u64,
  recovery_size: i64,
  data_size: i64,
  overhead: f64,
  output: OutputFormat,
) -> Result<()> {
  let disk_size_bytes = i64::try_from(disk_size_gb)
    .ok()
    .and_then(|gb| gb.checked_mul(GIB))
    .with_context(|| format!("Disk size of {disk_size_gb} GiB is too large"))?;
  let request = LayoutRequest::new(disk_size_bytes, recovery_size, data_size).with_overhead_factor(overhead);

  let layout = calculate(&request).context("Failed to compute partition layout")?;
  layout.validate().context("Computed partition layout is invalid")?;

  if output.is_json() {
    return print_json(&LayoutReport {
      disk_size_bytes,
      recovery_partition_size_bytes: request.recovery_partition_size_bytes(),
      layout: &layout,
    });
  }

  print_info(&format!(
    "Disk: {} GiB ({} sectors of {} bytes)",
    disk_size_gb, layout.total_sectors, layout.sector_size
  ));
  for partition in &layout.partitions {
    print_partition(partition);
  }
  print_field("last usable sector", &layout.last_usable_sector().to_string());
  Ok(())
}

fn print_partition(partition: &Partition) {
  let mut line = format!(
    "sectors {}-{} ({})",
    partition.start_sector,
    partition.end_sector,
    format_size(partition.size_bytes() as u64)
  );
  if let Some(guid) = &partition.type_guid {
    line.push_str(&format!(", type {guid}"));
  }
  print_field(&partition.name, &line);
}
