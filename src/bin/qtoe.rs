//! qtoe CLI - train and manage Q-learning tic-tac-toe agents

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flexi_logger::Logger;

#[derive(Parser)]
#[command(name = "qtoe")]
#[command(version, about = "Q-learning agents for N×N tic-tac-toe", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train agents by self-play
    Train(Box<qtoe::cli::commands::train::TrainArgs>),

    /// Summarize a stored value table
    Inspect(qtoe::cli::commands::inspect::InspectArgs),

    /// Clear learned values
    Reset(qtoe::cli::commands::reset::ResetArgs),
}

fn main() -> Result<()> {
    let _logger = Logger::try_with_env_or_str("info")
        .context("Invalid log specification")?
        .format(flexi_logger::colored_default_format)
        .start()
        .context("Failed to start logger")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Train(args) => qtoe::cli::commands::train::execute(*args),
        Commands::Inspect(args) => qtoe::cli::commands::inspect::execute(args),
        Commands::Reset(args) => qtoe::cli::commands::reset::execute(args),
    }
}
