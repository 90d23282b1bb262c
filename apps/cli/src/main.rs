//! LeadScout CLI: research organizations and collect decision-maker contacts.
//!
//! Queues one research job per organization, then stores every contact
//! found in a local lead database.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
