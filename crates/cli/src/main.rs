mod cmd;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{SetupArgs, Target};
use output::{OutputFormat, print_error};

/// appliance - Build OpenShift appliance disk image assets
#[derive(Parser)]
#[command(name = "appliance")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Generate assets and write them to the asset directory
  Build {
    #[command(flatten)]
    setup: SetupArgs,

    /// Asset to build
    #[arg(short, long, value_enum, default_value_t = Target::All)]
    target: Target,
  },

  /// Show the order in which assets would be generated
  Graph {
    #[command(flatten)]
    setup: SetupArgs,

    /// Asset whose dependencies to show
    #[arg(short, long, value_enum, default_value_t = Target::All)]
    target: Target,
  },

  /// Compute the recovery and data partition layout
  Layout {
    /// Disk size in GiB
    #[arg(long)]
    disk_size_gb: u64,

    /// Recovery ISO size in bytes
    #[arg(long)]
    recovery_size: i64,

    /// Data ISO size in bytes
    #[arg(long)]
    data_size: i64,

    /// Factor applied to the recovery ISO size for filesystem overhead
    #[arg(long, default_value_t = appliance_lib::partition::EXT4_OVERHEAD_FACTOR)]
    overhead: f64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Build { setup, target } => cmd::cmd_build(&setup, target),
    Commands::Graph { setup, target } => cmd::cmd_graph(&setup, target),
    Commands::Layout {
      disk_size_gb,
      recovery_size,
      data_size,
      overhead,
      output,
    } => cmd::cmd_layout(disk_size_gb, recovery_size, data_size, overhead, output),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{err:#}"));
      ExitCode::FAILURE
    }
  }
}
