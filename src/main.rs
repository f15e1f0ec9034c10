mod app;
mod cache;
mod commands;
mod config;
mod directory;
mod logging;
mod render;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "userdesk")]
#[command(about = "Command-line admin console for user records")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/userdesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Work from the local mirror only, without contacting the user service
  #[arg(long)]
  offline: bool,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _log_guard = logging::init()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  let app = app::App::new(&config, args.offline)?;
  app.run(args.command).await?;

  Ok(())
}
