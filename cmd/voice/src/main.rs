//! mkevoice - text-mode driver for the MKE.dev voice session.

use clap::{Parser, Subcommand};

mod commands;

use commands::{ChatCommand, ToolsCommand};

/// Drive the MKE.dev voice session from a terminal.
///
/// `chat` connects a live session using GEMINI_API_KEY and the built-in
/// sample dataset, reading turns from stdin. `tools` prints the function
/// table the session advertises to the model.
#[derive(Parser)]
#[command(name = "mkevoice")]
#[command(about = "MKE.dev voice session CLI")]
#[command(version)]
pub struct Cli {
    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive chat over a live session
    Chat(ChatCommand),
    /// List the registered function table
    Tools(ToolsCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .init();
    }

    match &cli.command {
        Commands::Chat(cmd) => cmd.run().await,
        Commands::Tools(cmd) => cmd.run().await,
    }
}
