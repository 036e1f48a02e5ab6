//! ltfw - Light Touch Firewall
//!
//! Periodically scans listening sockets and appends a block rule for every
//! one that is not allow-listed in the configuration.

mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ltfw")]
#[command(author, version, about = "ltfw - Light Touch Firewall.")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./config.toml, then the user and system config dirs)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Suppress output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Comprehensive output
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the firewall service in the foreground until SIGINT/SIGTERM
    Run,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Run => commands::run::run(cli.config).await?,
    }

    Ok(())
}
