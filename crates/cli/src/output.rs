//! Terminal output for the `appliance` commands.
//!
//! Results go to stdout and errors to stderr, each prefixed with a status
//! marker that is colored when the stream is a terminal. Library logs are
//! separate and go through tracing.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  /// Human readable summary
  #[default]
  Text,
  /// Pretty-printed JSON
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

const DONE: &str = "✓";
const FAILED: &str = "✗";
const NOTE: &str = "•";
const NEXT: &str = "→";

/// Format a size with binary units, the way disk and ISO sizes are quoted.
pub fn format_size(bytes: u64) -> String {
  const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

  if bytes < 1024 {
    return format!("{bytes} B");
  }
  let mut value = bytes as f64;
  let mut unit = UNITS[0];
  for candidate in UNITS {
    value /= 1024.0;
    unit = candidate;
    if value < 1024.0 {
      break;
    }
  }
  format!("{value:.2} {unit}")
}

pub fn format_elapsed(elapsed: Duration) -> String {
  let millis = elapsed.as_millis();
  if millis < 1000 {
    format!("{millis}ms")
  } else {
    format!("{:.1}s", elapsed.as_secs_f64())
  }
}

pub fn print_success(message: &str) {
  println!("{} {message}", DONE.if_supports_color(Stream::Stdout, |s| s.green()));
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    FAILED.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.bold())
  );
}

pub fn print_info(message: &str) {
  println!("{} {message}", NOTE.if_supports_color(Stream::Stdout, |s| s.cyan()));
}

/// One numbered entry of an ordered listing.
pub fn print_step(position: usize, name: &str) {
  println!(
    "  {position:>2} {} {name}",
    NEXT.if_supports_color(Stream::Stdout, |s| s.dimmed())
  );
}

/// An indented `label: value` line.
pub fn print_field(label: &str, value: &str) {
  println!("    {}: {value}", label.if_supports_color(Stream::Stdout, |s| s.bold()));
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to render JSON output")?;
  println!("{json}");
  Ok(())
}
