//! PaperScout CLI
//!
//! Retrieval-augmented search over the ACL Anthology paper corpus.

use clap::Parser;
use paperscout_core::{Config, PaperScoutError};

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), PaperScoutError> {
    match cli.command {
        Commands::Search(args) => {
            let config = Config::load()?;
            commands::search::run(args, &config, cli.format).await
        }
        Commands::Paper(args) => {
            let config = Config::load()?;
            commands::paper::run(args, &config, cli.format).await
        }
        Commands::Config(args) => commands::config::run(args),
    }
}
