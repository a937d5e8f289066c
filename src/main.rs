mod cache;
mod commands;
mod config;
mod http;
mod lifetime;
mod notify;
mod page;
mod worker;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pwa-shell")]
#[command(about = "An offline-first app shell: cache-first service worker and page controller")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/pwa-shell/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: commands::Command,
}

/// Log to stderr so stdout carries only command output.
///
/// Filter with `RUST_LOG`, e.g. `RUST_LOG=pwa_shell=debug`.
fn init_tracing() -> WorkerGuard {
  let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer))
    .with(filter)
    .init();

  guard
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _guard = init_tracing();

  let args = Args::parse();
  let config = config::Config::load(args.config.as_deref())?;

  args.command.run(&config).await
}
