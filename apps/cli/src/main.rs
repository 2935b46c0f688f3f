//! post-scorer CLI: score discussion posts and their replies with an LLM.
//!
//! Loads posts and comments from CSV, links comments to their posts, asks the
//! scoring model for a relevance score per post, and prints the results.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::warn;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Loaded before tracing so LOG_LEVEL from .env applies.
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    commands::init_tracing(&cli);

    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "failed to load .env file");
        }
    }

    commands::run(cli).await
}
