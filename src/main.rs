mod app;
mod cache;
mod commands;
mod config;
mod db;
mod event;
mod http;
mod logging;
mod worker;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "attendsw")]
#[command(about = "Offline caching worker for the AttenDANCE web app")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/attendsw/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Application origin, e.g. http://localhost:5000
  #[arg(short, long)]
  origin: Option<String>,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override origin if specified on command line
  let config = if let Some(origin) = args.origin {
    config::Config { origin, ..config }
  } else {
    config
  };
  config.origin_url()?;

  let _log_guard = logging::init(&config.log_path()?)?;

  let app = app::App::new(config)?;
  app.run(args.command).await?;

  Ok(())
}
