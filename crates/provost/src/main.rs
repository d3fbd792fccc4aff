use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod ui;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments and dispatch to the selected command
    let parsed = cli::Cli::parse();
    parsed.dispatch().await
}
