//! ResearchKit CLI: AI-powered topic research.
//!
//! Turns a topic into a Markdown summary written by a hosted LLM, and offers
//! a chat mode with conversation memory.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // .env is optional; real environment variables win.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
