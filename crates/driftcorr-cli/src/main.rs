mod commands;
mod input;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "driftcorr", about = "Drift correction for electron microscopy image stacks")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show SER file or image sequence metadata
    Info(commands::info::InfoArgs),
    /// Estimate per-frame drift without writing frames
    Estimate(commands::estimate::EstimateArgs),
    /// Estimate drift and write the corrected stack
    Correct(commands::correct::CorrectArgs),
    /// Print or save the default configuration as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Estimate(args) => commands::estimate::run(args),
        Commands::Correct(args) => commands::correct::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
